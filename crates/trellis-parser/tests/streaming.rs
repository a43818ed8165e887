use proptest::prelude::*;
use trellis_core::element::ParsedElement;
use trellis_parser::StreamTagParser;

const DOCUMENT: &str = r#"Here is the canvas you asked for.
<node id="overview" type="concept" title="Overview" row="0" col="0">
    Streaming layouts place boxes
    while text is still arriving.
</node>
<group id="parts" title="Moving parts" row="0" col="1">
  <node id="parser" type="detail" row="0" col="0">Finds tags even when a chunk ends at `</`.</node>
  <node id="layout" type="detail" row="1" col="0">Keeps x < y when heights change.</node>
</group>
<edge from="overview" to="parts" label="made of"/>
<node id="unicode" type="note" row="1" col="0">naïve café → ✓</node>
<edge from="parser" to="layout" dir="forward"></edge>
"#;

/// Feeds `text` split at `cuts` and collects everything the parser emits.
fn stream(text: &str, cuts: &[usize]) -> (Vec<ParsedElement>, Vec<usize>) {
    let mut parser = StreamTagParser::new();
    let mut elements = Vec::new();
    let mut cursors = Vec::new();
    let mut last = 0;

    for &cut in cuts.iter().chain(std::iter::once(&text.len())) {
        parser.append(&text[last..cut]);
        last = cut;
        elements.extend(parser.detect_complete());
        cursors.push(parser.processed_length());
    }
    elements.extend(parser.finish());
    (elements, cursors)
}

fn char_boundary_cuts(text: &str, raw: Vec<usize>) -> Vec<usize> {
    let mut cuts: Vec<usize> = raw
        .into_iter()
        .map(|mut cut| {
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            cut
        })
        .collect();
    cuts.sort_unstable();
    cuts.dedup();
    cuts
}

#[test]
fn test_one_shot_document() {
    let (elements, _) = stream(DOCUMENT, &[]);

    let kinds: Vec<_> = elements.iter().map(ParsedElement::kind_name).collect();
    assert_eq!(
        kinds,
        ["node", "node", "node", "group", "edge", "node", "edge"]
    );

    let ParsedElement::Node(parser_node) = &elements[1] else {
        panic!("expected node");
    };
    assert_eq!(parser_node.content(), "Finds tags even when a chunk ends at `</`.");
}

#[test]
fn test_byte_by_byte_matches_one_shot() {
    let cuts: Vec<usize> = (1..DOCUMENT.len())
        .filter(|&cut| DOCUMENT.is_char_boundary(cut))
        .collect();

    let (expected, _) = stream(DOCUMENT, &[]);
    let (actual, cursors) = stream(DOCUMENT, &cuts);

    assert_eq!(actual, expected);
    assert!(cursors.windows(2).all(|pair| pair[0] <= pair[1]));
}

proptest! {
    #[test]
    fn arbitrary_chunking_matches_one_shot(
        raw in prop::collection::vec(0usize..DOCUMENT.len(), 0..24),
    ) {
        let cuts = char_boundary_cuts(DOCUMENT, raw);
        let (expected, _) = stream(DOCUMENT, &[]);
        let (actual, cursors) = stream(DOCUMENT, &cuts);

        prop_assert_eq!(actual, expected);
        prop_assert!(cursors.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn arbitrary_text_never_panics(text in any::<String>(), split in 0usize..64) {
        let mut cut = split.min(text.len());
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }

        let mut parser = StreamTagParser::new();
        parser.append(&text[..cut]);
        parser.detect_complete();
        let _ = parser.detect_incomplete_node();
        let _ = parser.detect_incomplete_group();
        parser.append(&text[cut..]);
        parser.detect_complete();
        parser.finish();

        prop_assert!(parser.processed_length() <= text.len());
    }
}
