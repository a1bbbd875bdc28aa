//! Strict scan of the decoded markup into raw cell records. Any reader or
//! attribute error is a parse failure; the recovery cascade in `lib.rs`
//! decides what to do about it.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

const ROOT_ELEMENT: &[u8] = b"root";
const CELL_ELEMENT: &[u8] = b"mxCell";
const PARAMS_ELEMENT: &[u8] = b"mxParams";
const PARAM_ELEMENT: &[u8] = b"mxParam";
const PROMPT_FILE_ATTR: &str = "promptfile";

/// One `mxCell` element as it appears in the document, before any model
/// decisions are made.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct RawCell {
    pub id: Option<String>,
    pub cell_type: Option<String>,
    pub value: Option<String>,
    pub source: Option<String>,
    pub target: Option<String>,
    pub prompt_files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ScanError {
    /// The markup did not survive a strict parse; carries the reader detail.
    Syntax(String),
    /// The markup parsed but contains no `root` container element.
    MissingRoot,
}

/// Walks the document and collects every cell inside the `root` container,
/// in document order. Attribute lists are validated strictly on every
/// element so that malformed values fail here rather than downstream.
pub(crate) fn scan_document(text: &str) -> Result<Vec<RawCell>, ScanError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().check_end_names = true;

    let mut cells = Vec::new();
    let mut current: Option<RawCell> = None;
    let mut root_depth = 0usize;
    let mut in_params = false;
    let mut found_root = false;
    let mut saw_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                saw_element = true;
                let attributes = read_attributes(&element)?;
                match element.name().as_ref() {
                    ROOT_ELEMENT => {
                        found_root = true;
                        root_depth += 1;
                    }
                    CELL_ELEMENT if root_depth > 0 => {
                        if let Some(done) = current.replace(cell_from(attributes)) {
                            cells.push(done);
                        }
                    }
                    PARAMS_ELEMENT if current.is_some() => in_params = true,
                    PARAM_ELEMENT => {
                        collect_prompt_file(&attributes, in_params, current.as_mut());
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(element)) => {
                saw_element = true;
                let attributes = read_attributes(&element)?;
                match element.name().as_ref() {
                    ROOT_ELEMENT => found_root = true,
                    CELL_ELEMENT if root_depth > 0 => cells.push(cell_from(attributes)),
                    PARAM_ELEMENT => {
                        collect_prompt_file(&attributes, in_params, current.as_mut());
                    }
                    _ => {}
                }
            }
            Ok(Event::End(element)) => match element.name().as_ref() {
                ROOT_ELEMENT => root_depth = root_depth.saturating_sub(1),
                CELL_ELEMENT => {
                    if let Some(done) = current.take() {
                        cells.push(done);
                    }
                }
                PARAMS_ELEMENT => in_params = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(ScanError::Syntax(error.to_string())),
        }
    }

    if !saw_element {
        return Err(ScanError::Syntax("no element found".to_string()));
    }
    if !found_root {
        return Err(ScanError::MissingRoot);
    }
    Ok(cells)
}

fn read_attributes(element: &BytesStart<'_>) -> Result<Vec<(String, String)>, ScanError> {
    let mut attributes = Vec::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|error| ScanError::Syntax(error.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        // Well-formedness: a raw '<' may not appear inside an attribute
        // value. Decoded parameter blobs routinely violate this; failing
        // here hands them to the recovery cascade.
        if attribute.value.contains(&b'<') {
            return Err(ScanError::Syntax(format!(
                "attribute '{key}' contains a raw '<' in its value"
            )));
        }
        let value = attribute
            .unescape_value()
            .map_err(|error| ScanError::Syntax(error.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

fn cell_from(attributes: Vec<(String, String)>) -> RawCell {
    let mut cell = RawCell::default();
    for (key, value) in attributes {
        match key.as_str() {
            "id" => cell.id = Some(value),
            "type" => cell.cell_type = Some(value),
            "value" => cell.value = Some(value),
            "source" => cell.source = Some(value),
            "target" => cell.target = Some(value),
            _ => {}
        }
    }
    cell
}

fn collect_prompt_file(
    attributes: &[(String, String)],
    in_params: bool,
    current: Option<&mut RawCell>,
) {
    if !in_params {
        return;
    }
    let Some(cell) = current else {
        return;
    };
    let prompt = attributes
        .iter()
        .find(|(key, _)| key == PROMPT_FILE_ATTR)
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();
    if !prompt.is_empty() {
        cell.prompt_files.push(prompt.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::{ScanError, scan_document};

    #[test]
    fn collects_cells_inside_root_in_document_order() {
        let cells = scan_document(
            r#"<mxGraphModel><root>
                <mxCell id="0"/>
                <mxCell id="2" type="Navigation" value="Main menu"/>
                <mxCell id="7" source="2" target="0" value="press 1"/>
            </root></mxGraphModel>"#,
        )
        .expect("document scans");

        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].id.as_deref(), Some("0"));
        assert_eq!(cells[1].cell_type.as_deref(), Some("Navigation"));
        assert_eq!(cells[2].source.as_deref(), Some("2"));
        assert_eq!(cells[2].target.as_deref(), Some("0"));
        assert_eq!(cells[2].value.as_deref(), Some("press 1"));
    }

    #[test]
    fn collects_prompt_files_in_parameter_order() {
        let cells = scan_document(
            r#"<root>
                <mxCell id="3" type="Navigation">
                    <mxParams>
                        <mxParam promptfile="1-a_VOICEPROMPT.wav"/>
                        <mxParam promptfile="2-b.wav"/>
                        <mxParam other="ignored"/>
                        <mxParam promptfile=""/>
                    </mxParams>
                </mxCell>
            </root>"#,
        )
        .expect("document scans");

        assert_eq!(cells.len(), 1);
        assert_eq!(
            cells[0].prompt_files,
            vec!["1-a_VOICEPROMPT.wav", "2-b.wav"]
        );
    }

    #[test]
    fn params_outside_a_cell_are_ignored() {
        let cells = scan_document(
            r#"<root>
                <mxParams><mxParam promptfile="stray.wav"/></mxParams>
                <mxCell id="1"/>
            </root>"#,
        )
        .expect("document scans");
        assert_eq!(cells.len(), 1);
        assert!(cells[0].prompt_files.is_empty());
    }

    #[test]
    fn cells_outside_root_are_ignored() {
        let cells = scan_document(
            r#"<doc><mxCell id="outside"/><root><mxCell id="inside"/></root></doc>"#,
        )
        .expect("document scans");
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].id.as_deref(), Some("inside"));
    }

    #[test]
    fn missing_root_container_is_reported() {
        let result = scan_document("<mxGraphModel><mxCell id=\"1\"/></mxGraphModel>");
        assert_eq!(result, Err(ScanError::MissingRoot));
    }

    #[test]
    fn mismatched_tags_fail_the_strict_parse() {
        let result = scan_document("<root><mxCell id=\"1\"></root>");
        assert!(matches!(result, Err(ScanError::Syntax(_))));
    }

    #[test]
    fn bare_ampersand_in_attribute_fails_the_strict_parse() {
        let result = scan_document(r#"<root><mxCell id="1" value="a & b"/></root>"#);
        assert!(matches!(result, Err(ScanError::Syntax(_))));
    }

    #[test]
    fn raw_angle_bracket_in_attribute_fails_the_strict_parse() {
        let result = scan_document(r#"<root><mxCell id="1" value="a < b"/></root>"#);
        assert!(matches!(result, Err(ScanError::Syntax(_))));
    }

    #[test]
    fn escaped_angle_bracket_in_attribute_is_fine() {
        let cells = scan_document(r#"<root><mxCell id="1" value="a &lt; b"/></root>"#)
            .expect("document scans");
        assert_eq!(cells[0].value.as_deref(), Some("a < b"));
    }

    #[test]
    fn empty_root_yields_no_cells() {
        let cells = scan_document("<root/>").expect("document scans");
        assert!(cells.is_empty());
    }

    #[test]
    fn input_without_any_element_is_a_syntax_failure() {
        assert!(matches!(scan_document(""), Err(ScanError::Syntax(_))));
        assert!(matches!(
            scan_document("   just text   "),
            Err(ScanError::Syntax(_))
        ));
    }
}
