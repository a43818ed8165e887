use trellis_core::{
    element::EdgeElement,
    error::ErrorCode,
    geometry::{Bounds, Point, Size},
    identifier::Id,
};

use super::*;
use crate::{
    config::LayoutConfig,
    error::TransportError,
    host::{
        HostSurface, NodeRender,
        testing::{Call, RecordingHost},
    },
};

fn session() -> Session {
    Session::new(LayoutConfig::default(), SessionOptions::default())
}

fn feed_all(session: &mut Session, host: &mut RecordingHost, chunks: &[&str]) -> Vec<Id> {
    chunks
        .iter()
        .flat_map(|chunk| session.feed(chunk, host))
        .collect()
}

mod streaming_tests {
    use super::*;

    const NODE: &str = "<node id=\"a\" type=\"concept\" row=\"0\" col=\"0\">\n    line one\n    line two\n</node>";

    #[test]
    fn test_byte_by_byte_creates_once() {
        let mut session = session();
        let mut host = RecordingHost::default();

        let mut created = Vec::new();
        let mut feeds = 0;
        for (index, ch) in NODE.char_indices() {
            created.extend(session.feed(&NODE[index..index + ch.len_utf8()], &mut host));
            feeds += 1;
        }
        created.extend(session.finish(&mut host));

        assert_eq!(created, [Id::new("a")]);
        assert!(session.is_complete(Id::new("a")));
        assert_eq!(session.node_content(Id::new("a")), Some("line one\nline two"));
        assert_eq!(host.contents[&Id::new("a")], "line one\nline two");
        assert_eq!(host.refreshes(), feeds + 1);
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_preview_grows_then_finalizes() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed("<node id=\"a\" row=\"0\" col=\"0\">first", &mut host);
        assert!(!session.is_complete(Id::new("a")));
        assert_eq!(session.node_content(Id::new("a")), Some("first"));

        session.feed("\nsecond</nod", &mut host);
        assert_eq!(session.node_content(Id::new("a")), Some("first\nsecond"));

        session.feed("e>", &mut host);
        assert!(session.is_complete(Id::new("a")));
        assert_eq!(session.element_count(), 1);
    }

    #[test]
    fn test_one_refresh_per_chunk() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed(
            "<node id=\"a\" row=\"0\" col=\"0\">A</node><node id=\"b\" row=\"1\" col=\"0\">B</node>",
            &mut host,
        );

        assert_eq!(host.refreshes(), 1);
        assert_eq!(host.calls.last(), Some(&Call::Refresh));
    }

    #[test]
    fn test_duplicate_id_is_dropped() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed(
            "<node id=\"a\" row=\"0\" col=\"0\">A</node>\n<node id=\"a\" row=\"1\" col=\"0\">again</node>",
            &mut host,
        );

        assert_eq!(session.element_count(), 1);
        assert_eq!(session.node_content(Id::new("a")), Some("A"));
        let duplicates: Vec<_> = session
            .diagnostics()
            .iter()
            .filter(|diag| diag.code() == Some(ErrorCode::E104))
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert!(duplicates[0].severity().is_error());
    }

    #[test]
    fn test_parser_diagnostics_are_collected() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed("<node row=\"0\" col=\"0\">no id</node>", &mut host);
        session.finish(&mut host);

        assert_eq!(session.element_count(), 0);
        assert!(
            session
                .diagnostics()
                .iter()
                .any(|diag| diag.code() == Some(ErrorCode::E101))
        );
    }

    #[test]
    fn test_column_stacking_uses_host_heights() {
        let mut session = session();
        let mut host = RecordingHost::default();

        feed_all(
            &mut session,
            &mut host,
            &[
                "<node id=\"a\" row=\"0\" col=\"0\">1\n2\n3</node>",
                "<node id=\"b\" row=\"1\" col=\"0\">1</node>",
            ],
        );

        // a: 40 + 3 * 20 = 100 high, starting below the 60px header.
        assert_eq!(session.element_position(Id::new("a")), Some(Point::new(40.0, 60.0)));
        assert_eq!(session.element_position(Id::new("b")), Some(Point::new(40.0, 200.0)));
    }

    /// Reports every node as unmeasured.
    #[derive(Default)]
    struct UnmeasuredHost;

    impl HostSurface for UnmeasuredHost {
        fn render_node(&mut self, _node: &NodeRender<'_>) -> Size {
            Size::default()
        }
        fn render_group(&mut self, _id: Id, _title: &str, _bounds: Bounds) {}
        fn render_edge(&mut self, _edge: &EdgeElement) {}
        fn move_element(&mut self, _id: Id, _position: Point) {}
        fn remove_element(&mut self, _id: Id) {}
    }

    #[test]
    fn test_unmeasured_nodes_use_configured_size() {
        let config = LayoutConfig::default().with_element_size(300.0, 150.0);
        let mut session = Session::new(config, SessionOptions::default());
        let mut host = UnmeasuredHost;

        session.feed(
            "<node id=\"a\" row=\"0\" col=\"0\">A</node><node id=\"b\" row=\"1\" col=\"0\">B</node>",
            &mut host,
        );

        let a = session.element_bounds(Id::new("a")).unwrap();
        assert_eq!(a.to_size(), Size::new(300.0, 150.0));
        // 60 + 150 + 40 gap
        assert_eq!(session.element_position(Id::new("b")), Some(Point::new(40.0, 250.0)));
    }
}

mod group_tests {
    use super::*;

    #[test]
    fn test_children_are_placed_inside_the_group() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed(
            "<group id=\"g\" title=\"G\" row=\"0\" col=\"0\">\n<node id=\"c\" row=\"0\" col=\"0\">child</node>\n</group>",
            &mut host,
        );

        let group = session.group_bounds(Id::new("g")).unwrap();
        let child = session.element_bounds(Id::new("c")).unwrap();
        assert_eq!(group.min_point(), Point::new(40.0, 60.0));
        assert_eq!(child.min_point(), Point::new(80.0, 120.0));
        assert!(child.max_x() + 40.0 <= group.max_x());
        assert!(child.max_y() + 40.0 <= group.max_y());
        assert_eq!(host.groups[&Id::new("g")], group);
    }

    #[test]
    fn test_children_before_group_close_are_not_duplicated() {
        let mut session = session();
        let mut host = RecordingHost::default();

        let created = feed_all(
            &mut session,
            &mut host,
            &[
                "<group id=\"g\" title=\"G\" row=\"0\" col=\"0\">",
                "<node id=\"c1\" row=\"0\" col=\"0\">one</node>",
                "<node id=\"c2\" row=\"1\" col=\"0\">two</node>",
                "</group>",
            ],
        );

        assert_eq!(created, [Id::new("g"), Id::new("c1"), Id::new("c2")]);
        assert!(session.is_complete(Id::new("g")));
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_group_growth_pushes_root_elements_down() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed("<group id=\"g\" title=\"G\" row=\"0\" col=\"0\">", &mut host);
        let below = session.create_element(Id::new("below"), 1, 0, "x", &mut host);
        // Empty group is 100 high: header clearance 60 plus padding 40.
        assert_eq!(below, Point::new(40.0, 200.0));

        session.feed(
            "<node id=\"c\" row=\"0\" col=\"0\">one line</node></group>",
            &mut host,
        );

        // Group grew to 160 high.
        assert_eq!(host.positions[&Id::new("below")], Point::new(40.0, 260.0));
        assert_eq!(
            session.element_position(Id::new("below")),
            Some(Point::new(40.0, 260.0))
        );
        assert_eq!(
            session.group_bounds(Id::new("g")).unwrap().to_size(),
            Size::new(440.0, 160.0)
        );
    }

    #[test]
    fn test_moved_group_carries_children() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.create_element(Id::new("top"), 0, 0, "x", &mut host);
        session.feed(
            "<group id=\"g\" title=\"G\" row=\"1\" col=\"0\"><node id=\"c\" row=\"0\" col=\"0\">c</node></group>",
            &mut host,
        );
        let child_before = session.element_position(Id::new("c")).unwrap();

        session.update_element_content(Id::new("top"), "1\n2\n3", &mut host);

        let child_after = session.element_position(Id::new("c")).unwrap();
        assert_eq!(child_after.x(), child_before.x());
        assert_eq!(child_after.y() - child_before.y(), 40.0);
        assert_eq!(host.positions[&Id::new("c")], child_after);
    }
}

mod reference_tests {
    use super::*;

    #[test]
    fn test_edge_waits_for_both_endpoints() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed("<edge from=\"a\" to=\"b\"/>", &mut host);
        assert_eq!(session.pending_count(), 1);

        session.feed("<node id=\"a\" row=\"0\" col=\"0\">A</node>", &mut host);
        assert_eq!(session.pending_count(), 1);
        assert!(session.edges().is_empty());

        session.feed("<node id=\"b\" row=\"1\" col=\"0\">B</node>", &mut host);
        assert_eq!(session.pending_count(), 0);
        assert_eq!(session.edges().len(), 1);

        let node_b = host
            .calls
            .iter()
            .position(|call| *call == Call::Node(Id::new("b")))
            .unwrap();
        let edge = host
            .calls
            .iter()
            .position(|call| *call == Call::Edge(Id::new("a"), Id::new("b")))
            .unwrap();
        assert!(edge > node_b);
    }

    #[test]
    fn test_unresolved_edge_dropped_at_finish() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.feed(
            "<node id=\"a\" row=\"0\" col=\"0\">A</node><edge from=\"a\" to=\"ghost\"/>",
            &mut host,
        );
        session.finish(&mut host);

        assert!(session.edges().is_empty());
        assert_eq!(session.pending_count(), 0);
        let unresolved = session
            .diagnostics()
            .iter()
            .filter(|diag| diag.code() == Some(ErrorCode::E202))
            .count();
        assert_eq!(unresolved, 1);
    }
}

mod consumer_tests {
    use super::*;

    #[test]
    fn test_update_content_cascades() {
        let mut session = session();
        let mut host = RecordingHost::default();

        let x = session.create_element(Id::new("x"), 0, 0, "one", &mut host);
        let y = session.create_element(Id::new("y"), 1, 0, "one", &mut host);
        assert_eq!(x, Point::new(40.0, 60.0));
        assert_eq!(y, Point::new(40.0, 160.0));
        let before = session.container_bounds();

        assert!(session.update_element_content(Id::new("x"), "1\n2\n3", &mut host));

        assert_eq!(host.positions[&Id::new("y")], Point::new(40.0, 200.0));
        let after = session.container_bounds();
        assert_eq!(after.origin(), before.origin());
        assert_eq!(after.height(), 300.0);
        assert!(after.width() >= before.width());
    }

    #[test]
    fn test_update_unknown_is_rejected() {
        let mut session = session();
        let mut host = RecordingHost::default();
        assert!(!session.update_element_content(Id::new("nope"), "text", &mut host));
        assert_eq!(host.refreshes(), 0);
    }

    #[test]
    fn test_create_existing_reports_duplicate() {
        let mut session = session();
        let mut host = RecordingHost::default();

        let first = session.create_element(Id::new("x"), 0, 0, "one", &mut host);
        let second = session.create_element(Id::new("x"), 3, 3, "two", &mut host);

        assert_eq!(first, second);
        assert_eq!(session.node_content(Id::new("x")), Some("one"));
        assert_eq!(session.element_count(), 1);
    }

    #[test]
    fn test_consumer_content_is_prepared() {
        let mut session = session();
        let mut host = RecordingHost::default();

        session.create_element(Id::new("x"), 0, 0, "    a\n      b\n</no", &mut host);
        assert_eq!(session.node_content(Id::new("x")), Some("a\n  b"));
    }
}

mod generation_tests {
    use super::*;

    fn originals() -> Vec<Id> {
        vec![Id::new("old-1"), Id::new("old-2")]
    }

    fn ok(chunk: &str) -> Result<String, TransportError> {
        Ok(chunk.to_string())
    }

    #[test]
    fn test_failure_before_first_chunk_preserves_originals() {
        let mut host = RecordingHost::default();
        let mut events = EventLog::new();

        let outcome = Generation::new(LayoutConfig::default())
            .replacing(originals())
            .run(
                [Err(TransportError::new("timeout"))],
                &mut host,
                &mut events,
            );

        assert!(!outcome.is_success());
        assert_eq!(outcome.replacement(), ReplacementOutcome::Preserved { kept: 2 });
        assert!(host.removed().is_empty());

        let kinds: Vec<_> = events.kinds().cloned().collect();
        assert_eq!(
            kinds,
            [
                LifecycleEventKind::Started,
                LifecycleEventKind::Failed {
                    error: "timeout".to_string()
                },
            ]
        );
        assert_eq!(
            outcome.session().diagnostics()[0].code(),
            Some(ErrorCode::E300)
        );
    }

    #[test]
    fn test_failure_after_first_chunk_keeps_partial_content() {
        let mut host = RecordingHost::default();
        let mut events = EventLog::new();

        let outcome = Generation::new(LayoutConfig::default())
            .replacing(originals())
            .run(
                vec![
                    ok("<node id=\"a\" row=\"0\" col=\"0\">A</node>"),
                    Err(TransportError::new("reset")),
                    ok("<node id=\"b\" row=\"1\" col=\"0\">B</node>"),
                ],
                &mut host,
                &mut events,
            );

        assert_eq!(outcome.replacement(), ReplacementOutcome::Replaced { removed: 2 });
        assert_eq!(host.removed(), originals());
        assert_eq!(outcome.chunks(), 1);
        assert_eq!(outcome.session().element_ids(), [Id::new("a")]);

        let last = events.events().last().unwrap();
        assert_eq!(
            last.kind(),
            &LifecycleEventKind::Failed {
                error: "reset".to_string()
            }
        );
    }

    #[test]
    fn test_successful_run_sequence() {
        let mut host = RecordingHost::default();
        let mut events = EventLog::new();

        let outcome = Generation::new(LayoutConfig::default())
            .replacing(originals())
            .run(
                vec![
                    ok("<node id=\"a\" row=\"0\" col=\"0\">Hel"),
                    ok("lo</node><edge from=\"a\" to=\"a\"/>"),
                ],
                &mut host,
                &mut events,
            );

        assert!(outcome.is_success());
        assert_eq!(host.removed(), originals());

        let kinds: Vec<_> = events.kinds().cloned().collect();
        assert_eq!(kinds.first(), Some(&LifecycleEventKind::Started));
        assert_eq!(
            kinds.last(),
            Some(&LifecycleEventKind::Completed { elements: 1 })
        );
        assert_eq!(kinds.iter().filter(|kind| kind.is_terminal()).count(), 1);
        assert_eq!(
            kinds
                .iter()
                .filter(|kind| matches!(kind, LifecycleEventKind::ElementCreated { .. }))
                .count(),
            1
        );
        assert!(
            events
                .events()
                .windows(2)
                .all(|pair| pair[0].timestamp() < pair[1].timestamp())
        );
    }

    #[test]
    fn test_empty_stream_completes_and_preserves() {
        let mut host = RecordingHost::default();
        let mut events = EventLog::new();

        let outcome = Generation::new(LayoutConfig::default())
            .replacing(originals())
            .run(Vec::new(), &mut host, &mut events);

        assert!(outcome.is_success());
        assert_eq!(outcome.replacement(), ReplacementOutcome::Preserved { kept: 2 });
        assert_eq!(events.events().len(), 2);
    }
}
