//! Mod load order from the game launcher's configuration.
//!
//! The launcher writes `LauncherData.xml`, listing installed modules in load
//! order: the first entry loads first and every later entry overrides it for
//! conflicting assets. Two layouts are understood:
//!
//! ```xml
//! <!-- launcher layout: only selected modules are active -->
//! <UserData><SingleplayerData><ModDatas>
//!   <UserModData><Id>Native</Id><IsSelected>true</IsSelected></UserModData>
//! </ModDatas></SingleplayerData></UserData>
//!
//! <!-- flat layout -->
//! <LauncherData><LoadOrder><Module Id="Native"/></LoadOrder></LauncherData>
//! ```
//!
//! A missing or malformed file yields an empty list (logged). Callers treat an
//! empty list as "abort the scan".

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadOrderError {
    #[error("malformed load order XML at byte {position}: {source}")]
    Xml {
        position: u64,
        source: quick_xml::Error,
    },
}

/// Default launcher configuration path under the user's documents folder.
pub fn default_load_order_path() -> Option<PathBuf> {
    let home = std::env::var_os("USERPROFILE").or_else(|| std::env::var_os("HOME"))?;
    Some(
        PathBuf::from(home)
            .join("Documents")
            .join("Mount and Blade II Bannerlord")
            .join("Configs")
            .join("LauncherData.xml"),
    )
}

/// Read the ordered list of active mod ids, lowest priority first.
///
/// Never fails: problems are logged and produce an empty list.
pub fn read_load_order(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(path = %path.display(), "cannot read load order file: {e}");
            return Vec::new();
        }
    };
    match parse_load_order(&content) {
        Ok(ids) => {
            tracing::info!("found {} mods in load order", ids.len());
            ids
        }
        Err(e) => {
            tracing::error!(path = %path.display(), "{e}");
            Vec::new()
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    IsSelected,
}

#[derive(Default)]
struct PendingMod {
    id: Option<String>,
    selected: Option<bool>,
}

/// Parse launcher XML into mod ids in load order.
pub fn parse_load_order(xml: &str) -> Result<Vec<String>, LoadOrderError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    let mut in_load_order = false;
    let mut pending: Option<PendingMod> = None;
    let mut capture: Option<Field> = None;

    loop {
        let event = reader.read_event().map_err(|source| LoadOrderError::Xml {
            position: reader.error_position(),
            source,
        })?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"LoadOrder" => in_load_order = true,
                b"Module" if in_load_order => push_module_id(&e, &mut ids),
                b"UserModData" => pending = Some(PendingMod::default()),
                b"Id" if pending.is_some() => capture = Some(Field::Id),
                b"IsSelected" if pending.is_some() => capture = Some(Field::IsSelected),
                _ => {}
            },
            Event::Empty(e) => {
                if in_load_order && e.name().as_ref() == b"Module" {
                    push_module_id(&e, &mut ids);
                }
            }
            Event::Text(t) => {
                if let (Some(field), Some(entry)) = (capture, pending.as_mut()) {
                    let text = String::from_utf8_lossy(&t).trim().to_string();
                    match field {
                        Field::Id => entry.id = Some(text),
                        Field::IsSelected => entry.selected = Some(text.eq_ignore_ascii_case("true")),
                    }
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"LoadOrder" => in_load_order = false,
                b"Id" | b"IsSelected" => capture = None,
                b"UserModData" => {
                    if let Some(PendingMod {
                        id: Some(id),
                        selected,
                    }) = pending.take()
                        && selected.unwrap_or(true)
                        && !id.is_empty()
                    {
                        ids.push(id);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(ids)
}

fn push_module_id(element: &BytesStart<'_>, ids: &mut Vec<String>) {
    if let Ok(Some(attr)) = element.try_get_attribute("Id") {
        let id = String::from_utf8_lossy(&attr.value).trim().to_string();
        if !id.is_empty() {
            ids.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_flat_layout_in_order() {
        let xml = r#"<LauncherData>
            <LoadOrder>
                <Module Id="Native"/>
                <Module Id="SandBoxCore"></Module>
                <Module Id="BetterArmors"/>
            </LoadOrder>
        </LauncherData>"#;
        assert_eq!(
            parse_load_order(xml).unwrap(),
            vec!["Native", "SandBoxCore", "BetterArmors"]
        );
    }

    #[test]
    fn parses_launcher_layout_skipping_unselected() {
        let xml = r#"<UserData><SingleplayerData><ModDatas>
            <UserModData><Id>Native</Id><IsSelected>true</IsSelected></UserModData>
            <UserModData><Id>Disabled</Id><IsSelected>false</IsSelected></UserModData>
            <UserModData><Id>Sandbox</Id><IsSelected>True</IsSelected></UserModData>
        </ModDatas></SingleplayerData></UserData>"#;
        assert_eq!(parse_load_order(xml).unwrap(), vec!["Native", "Sandbox"]);
    }

    #[test]
    fn module_outside_load_order_is_ignored() {
        let xml = r#"<Root><Module Id="Stray"/><LoadOrder><Module Id="A"/></LoadOrder></Root>"#;
        assert_eq!(parse_load_order(xml).unwrap(), vec!["A"]);
    }

    #[test]
    fn malformed_xml_is_error() {
        let xml = "<LoadOrder><Module Id=\"A\"></LoadOrder>";
        assert!(parse_load_order(xml).is_err());
    }

    #[test]
    fn read_malformed_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("LauncherData.xml");
        std::fs::write(&path, "<LoadOrder><Module Id=\"A\"></LoadOrder>").unwrap();
        assert!(read_load_order(&path).is_empty());
    }

    #[test]
    fn read_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(read_load_order(&tmp.path().join("nope.xml")).is_empty());
    }
}
