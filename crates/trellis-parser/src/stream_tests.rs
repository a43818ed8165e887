//! Scenario tests for the incremental stream parser.
//!
//! These feed hand-written streams through [`StreamTagParser`] in various
//! chunkings and check what is emitted, what is previewed and what is
//! reported.

use trellis_core::{
    element::{EdgeDirection, NodeKind, ParsedElement},
    error::ErrorCode,
};

use crate::{StreamTagParser, prepare_content};

fn parser_with(text: &str) -> StreamTagParser {
    let mut parser = StreamTagParser::new();
    parser.append(text);
    parser
}

fn count(parser: &StreamTagParser, code: ErrorCode) -> usize {
    parser
        .diagnostics()
        .iter()
        .filter(|diag| diag.code() == Some(code))
        .count()
}

fn ids(elements: &[ParsedElement]) -> Vec<String> {
    elements
        .iter()
        .map(|element| match element {
            ParsedElement::Node(node) => node.id().to_string(),
            ParsedElement::Group(group) => group.id().to_string(),
            ParsedElement::Edge(edge) => format!("{}->{}", edge.from(), edge.to()),
        })
        .collect()
}

mod complete_node_tests {
    use super::*;

    #[test]
    fn test_close_tag_split_across_chunks() {
        let mut parser = parser_with(r#"<node id="n1" type="concept" row="0" col="0">Content text</"#);
        assert!(parser.detect_complete_nodes().is_empty());

        parser.append("node>");
        let nodes = parser.detect_complete_nodes();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id(), "n1");
        assert_eq!(nodes[0].kind(), NodeKind::Concept);
        assert_eq!(nodes[0].content(), "Content text");
        assert!(!nodes[0].content().contains("</"));
    }

    #[test]
    fn test_node_is_never_emitted_twice() {
        let mut parser = parser_with(r#"<node id="a" row="0" col="0">A</node>"#);

        assert_eq!(parser.detect_complete_nodes().len(), 1);
        assert!(parser.detect_complete_nodes().is_empty());
        assert!(parser.detect_complete().is_empty());

        parser.append(r#"<node id="b" row="1" col="0">B</node>"#);
        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id(), "b");
    }

    #[test]
    fn test_cursor_moves_to_end_of_emitted_element() {
        let first = r#"<node id="a" row="0" col="0">A</node>"#;
        let mut parser = parser_with(first);
        parser.append(r#" trailing <node id="b" row="1" "#);

        parser.detect_complete();
        assert_eq!(parser.processed_length(), first.len());
        assert!(parser.unprocessed().starts_with(" trailing"));
    }

    #[test]
    fn test_attributes_split_mid_value() {
        let mut parser = parser_with(r#"<node id="alp"#);
        assert!(parser.detect_complete().is_empty());
        parser.append(r#"ha" title="A > B" ro"#);
        assert!(parser.detect_complete().is_empty());
        parser.append(r#"w="-3" col="2">body</node>"#);

        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id(), "alpha");
        assert_eq!(nodes[0].title(), Some("A > B"));
        assert_eq!(nodes[0].row(), -3);
        assert_eq!(nodes[0].col(), 2);
    }

    #[test]
    fn test_comparison_in_content_is_kept() {
        let mut parser = parser_with(r#"<node id="m" row="0" col="0">a < b and x<5</node>"#);
        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes[0].content(), "a < b and x<5");
    }

    #[test]
    fn test_self_closing_node_has_empty_content() {
        let mut parser = parser_with(r#"<node id="empty" row="2" col="1"/>"#);
        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].content(), "");
    }

    #[test]
    fn test_span_covers_whole_element() {
        let text = r#"intro <node id="s" row="0" col="0">x</node>"#;
        let mut parser = parser_with(text);
        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes[0].span().start(), 6);
        assert_eq!(nodes[0].span().end(), text.len());
    }
}

mod attribute_tests {
    use super::*;

    #[test]
    fn test_missing_id_drops_node_and_reports_once() {
        let mut parser = parser_with(r#"<node row="0" col="0">orphan</node>"#);

        assert!(parser.detect_complete_nodes().is_empty());
        assert!(parser.detect_complete_nodes().is_empty());
        assert_eq!(count(&parser, ErrorCode::E101), 1);
        assert_eq!(parser.processed_length(), 0);

        parser.append(r#"<node id="b" row="1" col="0">B</node>"#);
        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id(), "b");
        assert_eq!(parser.processed_length(), parser.buffer().len());
        assert_eq!(count(&parser, ErrorCode::E101), 1);
    }

    #[test]
    fn test_non_integer_row_is_rejected() {
        let mut parser = parser_with(r#"<node id="a" row="first" col="0">A</node>"#);
        assert!(parser.detect_complete_nodes().is_empty());
        assert_eq!(count(&parser, ErrorCode::E102), 1);
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let mut parser = parser_with(r#"<node id="a" type="hologram" row="0" col="0">A</node>"#);
        let nodes = parser.detect_complete_nodes();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind(), NodeKind::Default);
        assert_eq!(count(&parser, ErrorCode::E103), 1);
        assert!(!parser.diagnostics()[0].severity().is_error());
    }

    #[test]
    fn test_huge_coordinates_saturate() {
        let mut parser = parser_with(r#"<node id="far" row="99999999999" col="-99999999999">x</node>"#);
        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes[0].row(), i32::MAX);
        assert_eq!(nodes[0].col(), i32::MIN);
    }
}

mod malformed_tests {
    use super::*;

    #[test]
    fn test_unterminated_node_is_skipped() {
        let mut parser = parser_with(
            r#"<node id="a" row="0" col="0">never closed <node id="b" row="1" col="0">B</node>"#,
        );

        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id(), "b");
        assert_eq!(nodes[0].content(), "B");
        assert_eq!(count(&parser, ErrorCode::E100), 1);
    }

    #[test]
    fn test_stray_close_is_reported() {
        let mut parser = parser_with(r#"</node><node id="a" row="0" col="0">A</node>"#);
        let elements = parser.detect_complete();

        assert_eq!(ids(&elements), ["a"]);
        assert_eq!(count(&parser, ErrorCode::E100), 1);
    }

    #[test]
    fn test_broken_attribute_quote_is_skipped() {
        let mut parser = parser_with(r#"<node id="a row="0" col="0"><node id="b" row="0" col="0">B</node>"#);
        let elements = parser.detect_complete();

        assert_eq!(ids(&elements), ["b"]);
        assert_eq!(count(&parser, ErrorCode::E100), 1);
    }

    #[test]
    fn test_malformed_only_does_not_move_cursor() {
        let mut parser = parser_with("</edge> plain text");
        parser.detect_complete();
        assert_eq!(parser.processed_length(), 0);
        parser.detect_complete();
        assert_eq!(count(&parser, ErrorCode::E100), 1);
    }

    #[test]
    fn test_unknown_tags_are_content() {
        let mut parser = parser_with(r#"<node id="h" row="0" col="0"><b>bold</b> <div/></node>"#);
        let nodes = parser.detect_complete_nodes();
        assert_eq!(nodes[0].content(), "<b>bold</b> <div/>");
        assert!(parser.diagnostics().is_empty());
    }
}

mod group_tests {
    use super::*;

    const GROUP: &str = r#"<group id="g1" title="Basics" row="0" col="1">
  <node id="a" row="0" col="0">A</node>
  <node id="b" row="1" col="0">B</node>
</group>"#;

    #[test]
    fn test_complete_group_with_children() {
        let mut parser = parser_with(GROUP);
        let elements = parser.detect_complete();

        assert_eq!(ids(&elements), ["a", "b", "g1"]);
        let ParsedElement::Group(group) = &elements[2] else {
            panic!("expected group, got {:?}", elements[2]);
        };
        assert_eq!(group.title(), "Basics");
        assert_eq!(group.col(), 1);
        assert_eq!(group.children().len(), 2);
        assert!(
            group
                .children()
                .iter()
                .all(|child| child.group_id() == Some(group.id()))
        );
    }

    #[test]
    fn test_nodes_inside_open_group_carry_group_id() {
        let mut parser = parser_with(&GROUP[..GROUP.find("</group>").unwrap()]);
        let nodes = parser.detect_complete_nodes();

        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|node| node.group_id().is_some_and(|id| id == "g1")));
        assert!(parser.detect_complete_groups().is_empty());
    }

    #[test]
    fn test_nodes_after_group_have_no_group_id() {
        let mut parser = parser_with(GROUP);
        parser.append(r#"<node id="c" row="0" col="0">C</node>"#);
        let nodes = parser.detect_complete_nodes();

        let last = nodes.last().unwrap();
        assert_eq!(last.id(), "c");
        assert_eq!(last.group_id(), None);
    }

    #[test]
    fn test_nested_group_is_flattened() {
        let mut parser = parser_with(
            r#"<group id="outer" row="0" col="0">
<node id="a" row="0" col="0">A</node>
<group id="inner" row="0" col="1">
<node id="b" row="1" col="0">B</node>
</group>
</group>"#,
        );
        let elements = parser.detect_complete();

        assert_eq!(ids(&elements), ["a", "b", "outer"]);
        let ParsedElement::Node(inner_child) = &elements[1] else {
            panic!("expected node");
        };
        assert_eq!(inner_child.group_id().map(|id| id.to_string()), Some("outer".to_string()));
        assert_eq!(count(&parser, ErrorCode::E100), 1);
    }

    #[test]
    fn test_group_title_defaults_to_empty() {
        let mut parser = parser_with(r#"<group id="g" row="0" col="0"></group>"#);
        let groups = parser.detect_complete_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].title(), "");
        assert!(groups[0].children().is_empty());
    }

    #[test]
    fn test_unclosed_group_reported_at_finish() {
        let mut parser = parser_with(r#"<group id="g" row="0" col="0"><node id="a" row="0" col="0">A</node>"#);
        assert_eq!(parser.detect_complete().len(), 1);

        assert!(parser.finish().is_empty());
        assert_eq!(count(&parser, ErrorCode::E100), 1);
    }
}

mod edge_tests {
    use super::*;

    #[test]
    fn test_self_closing_edge() {
        let mut parser = parser_with(r#"<edge from="a" to="b" dir="both" label="uses"/>"#);
        let edges = parser.detect_complete_edges();

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].from(), "a");
        assert_eq!(edges[0].to(), "b");
        assert_eq!(edges[0].direction(), EdgeDirection::Both);
        assert_eq!(edges[0].label(), Some("uses"));
    }

    #[test]
    fn test_edge_with_empty_body() {
        let mut parser = parser_with(r#"<edge from="a" to="b">"#);
        assert!(parser.detect_complete_edges().is_empty());

        parser.append("</edge>");
        let edges = parser.detect_complete_edges();
        assert_eq!(edges.len(), 1);
        assert_eq!(parser.processed_length(), parser.buffer().len());
    }

    #[test]
    fn test_bodyless_edge_ends_at_next_tag() {
        let mut parser = parser_with(r#"<edge from="a" to="b"><node id="c" row="0" col="0">C</node>"#);
        let elements = parser.detect_complete();
        assert_eq!(ids(&elements), ["a->b", "c"]);
    }

    #[test]
    fn test_pending_edge_completes_at_finish() {
        let mut parser = parser_with(r#"<edge from="a" to="b">"#);
        assert!(parser.detect_complete().is_empty());

        let elements = parser.finish();
        assert_eq!(ids(&elements), ["a->b"]);
    }

    #[test]
    fn test_unknown_direction_falls_back_to_forward() {
        let mut parser = parser_with(r#"<edge from="a" to="b" dir="sideways"/>"#);
        let edges = parser.detect_complete_edges();
        assert_eq!(edges[0].direction(), EdgeDirection::Forward);
        assert_eq!(count(&parser, ErrorCode::E102), 1);
    }

    #[test]
    fn test_edge_missing_endpoint_is_dropped() {
        let mut parser = parser_with(r#"<edge from="a"/>"#);
        assert!(parser.detect_complete_edges().is_empty());
        assert_eq!(count(&parser, ErrorCode::E101), 1);
    }

    #[test]
    fn test_kind_queries_keep_other_kinds_queued() {
        let mut parser = parser_with(r#"<edge from="a" to="b"/><node id="a" row="0" col="0">A</node>"#);

        assert_eq!(parser.detect_complete_nodes().len(), 1);
        assert_eq!(parser.detect_complete_edges().len(), 1);
        assert!(parser.detect_complete().is_empty());
    }
}

mod incomplete_tests {
    use super::*;

    #[test]
    fn test_incomplete_node_preview_grows() {
        let mut parser = parser_with(r#"<node id="n1" type="question" row="0" col="0">Partial con"#);

        let preview = parser.detect_incomplete_node().unwrap();
        assert_eq!(preview.id(), "n1");
        assert_eq!(preview.kind(), NodeKind::Question);
        assert_eq!(preview.content(), "Partial con");

        parser.append("tent</no");
        let preview = parser.detect_incomplete_node().unwrap();
        assert_eq!(preview.content(), "Partial content");
        assert_eq!(parser.processed_length(), 0);
    }

    #[test]
    fn test_preview_stops_before_full_close_name() {
        for tail in ["</node", "</nodE", "<edge", "<group"] {
            let parser = parser_with(&format!(r#"<node id="n1" type="concept" row="0" col="0">Content text{tail}"#));

            let preview = parser.detect_incomplete_node().unwrap();
            assert_eq!(preview.content(), "Content text", "tail {tail:?}");
        }
    }

    #[test]
    fn test_incomplete_node_is_idempotent() {
        let parser = parser_with(r#"<node id="n1" row="0" col="0">text"#);
        assert_eq!(parser.detect_incomplete_node(), parser.detect_incomplete_node());
        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn test_incomplete_node_needs_complete_opening_tag() {
        let parser = parser_with(r#"<node id="n1" row="0" co"#);
        assert!(parser.detect_incomplete_node().is_none());
    }

    #[test]
    fn test_incomplete_node_without_attributes_is_silent() {
        let parser = parser_with(r#"<node row="0" col="0">text"#);
        assert!(parser.detect_incomplete_node().is_none());
        assert!(parser.diagnostics().is_empty());
    }

    #[test]
    fn test_incomplete_node_content_is_sanitized_by_pipeline() {
        let parser = parser_with("<node id=\"n\" row=\"0\" col=\"0\">\n    line one\n    line two\n    <");
        let preview = parser.detect_incomplete_node().unwrap();
        assert_eq!(prepare_content(preview.content()), "line one\nline two");
    }

    #[test]
    fn test_no_preview_once_node_completes() {
        let mut parser = parser_with(r#"<node id="n1" row="0" col="0">done</node>"#);
        assert!(parser.detect_incomplete_node().is_none());
        parser.detect_complete();
        assert!(parser.detect_incomplete_node().is_none());
    }

    #[test]
    fn test_incomplete_group_preview() {
        let parser = parser_with(
            r#"<group id="g" title="Draft" row="1" col="0"><node id="a" row="0" col="0">A</node><node id="b" row="1" col="0">B"#,
        );

        let group = parser.detect_incomplete_group().unwrap();
        assert_eq!(group.id(), "g");
        assert_eq!(group.title(), "Draft");
        assert_eq!(group.children().len(), 1);
        assert_eq!(group.children()[0].id(), "a");

        let node = parser.detect_incomplete_node().unwrap();
        assert_eq!(node.id(), "b");
        assert_eq!(node.group_id().map(|id| id.to_string()), Some("g".to_string()));
    }

    #[test]
    fn test_closed_group_is_not_incomplete() {
        let parser = parser_with(r#"<group id="g" row="0" col="0"></group>"#);
        assert!(parser.detect_incomplete_group().is_none());
    }
}
