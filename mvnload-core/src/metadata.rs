use quick_xml::Reader;
use quick_xml::events::Event;

/// A `maven-metadata.xml` document for one artifact family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionIndex {
    document: String,
    latest: Option<String>,
}

impl VersionIndex {
    pub fn new(document: impl Into<String>) -> Self {
        let document = document.into();
        let latest = extract_latest(&document);
        VersionIndex { document, latest }
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// The first `<latest>` value, falling back to the first `<version>`.
    pub fn latest(&self) -> Option<&str> {
        self.latest.as_deref()
    }

    /// Raw containment check against the whole document. A version string
    /// that happens to occur elsewhere in the document also counts.
    pub fn contains(&self, version: &str) -> bool {
        !version.is_empty() && self.document.contains(version)
    }
}

fn extract_latest(document: &str) -> Option<String> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut current: Option<Vec<u8>> = None;
    let mut first_version: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                current = Some(start.local_name().as_ref().to_vec());
            }
            Ok(Event::Text(text)) => {
                let Some(element) = current.as_deref() else {
                    continue;
                };

                let Ok(value) = text.unescape() else {
                    continue;
                };
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }

                match element {
                    b"latest" => return Some(value.to_string()),
                    b"version" if first_version.is_none() => {
                        first_version = Some(value.to_string());
                    }
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
    }

    first_version
}

#[cfg(test)]
mod tests {
    use super::*;

    const METADATA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata>
  <groupId>org.example</groupId>
  <artifactId>util</artifactId>
  <versioning>
    <latest>2.1</latest>
    <release>2.1</release>
    <versions>
      <version>1.0</version>
      <version>2.0</version>
      <version>2.1</version>
    </versions>
  </versioning>
</metadata>"#;

    #[test]
    fn prefers_latest_element() {
        let index = VersionIndex::new(METADATA);
        assert_eq!(index.latest(), Some("2.1"));
    }

    #[test]
    fn falls_back_to_first_version() {
        let index = VersionIndex::new(
            "<metadata><versioning><versions><version>0.3</version><version>0.4</version></versions></versioning></metadata>",
        );
        assert_eq!(index.latest(), Some("0.3"));
    }

    #[test]
    fn empty_document_has_no_latest() {
        assert_eq!(VersionIndex::new("").latest(), None);
        assert_eq!(VersionIndex::new("<metadata/>").latest(), None);
    }

    #[test]
    fn containment_is_textual() {
        let index = VersionIndex::new(METADATA);
        assert!(index.contains("2.0"));
        assert!(!index.contains("3.0"));
        assert!(!index.contains(""));
    }
}
