//! Building reference records from MAME's own XML listings.
//!
//! Two sources are understood: the machine list (`mame -listxml`) and
//! software lists (`hash/*.xml`, `mame -getsoftlist`). Both produce
//! [`RomRecord`]s that [`write_reference`] serialises in the flat format read
//! by [`load_reference`](super::load_reference).

use std::collections::HashSet;
use std::io::{BufRead, Write};

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::{debug, info};

use crate::rom::RomRecord;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("XML syntax error at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rom usable as a reference record: it has a name and a sha1.
#[derive(Debug)]
struct XmlRom {
    name: String,
    sha1: String,
}

#[derive(Debug, Default)]
struct Machine {
    name: String,
    romof: Option<String>,
    is_bios: bool,
    roms: Vec<XmlRom>,
}

/// Read an attribute as unescaped text.
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, ImportError> {
    match element.try_get_attribute(name)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// A `rom` element worth recording. Roms merged from a parent, roms that were
/// never dumped, and roms missing a name or sha1 have no file of their own.
fn rom_element(element: &BytesStart<'_>) -> Result<Option<XmlRom>, ImportError> {
    if attribute(element, b"merge")?.is_some() {
        return Ok(None);
    }
    if attribute(element, b"status")?.as_deref() == Some("nodump") {
        return Ok(None);
    }
    let (Some(name), Some(sha1)) = (attribute(element, b"name")?, attribute(element, b"sha1")?)
    else {
        return Ok(None);
    };
    if name.is_empty() || sha1.is_empty() {
        return Ok(None);
    }
    Ok(Some(XmlRom {
        name,
        sha1: sha1.to_lowercase(),
    }))
}

/// Pull the next event, tagging syntax errors with their position.
fn next_event<'b, R: BufRead>(
    reader: &mut Reader<R>,
    buf: &'b mut Vec<u8>,
) -> Result<Event<'b>, ImportError> {
    match reader.read_event_into(buf) {
        Ok(event) => Ok(event),
        Err(source) => Err(ImportError::Syntax {
            position: reader.error_position(),
            source,
        }),
    }
}

/// Records from a MAME machine list.
///
/// BIOS machines come first. A machine whose `romof` parent is a BIOS is its
/// own archive. Any other machine with a `romof` parent lives in the parent's
/// archive, under a folder named after the machine. Only `rom` elements that
/// are direct children of a machine count; `disk` images are not archive
/// contents.
pub fn import_mame<R: BufRead>(reader: R) -> Result<Vec<RomRecord>, ImportError> {
    let mut reader = Reader::from_reader(reader);
    let mut buf = Vec::new();

    let mut machines: Vec<Machine> = Vec::new();
    let mut current: Option<Machine> = None;
    // Element depth below the current machine.
    let mut depth = 0usize;

    loop {
        buf.clear();
        match next_event(&mut reader, &mut buf)? {
            Event::Start(e) => {
                if let Some(machine) = current.as_mut() {
                    if depth == 0 && e.name().as_ref() == b"rom" {
                        machine.roms.extend(rom_element(&e)?);
                    }
                    depth += 1;
                } else if e.name().as_ref() == b"machine" {
                    current = Some(Machine {
                        name: attribute(&e, b"name")?.unwrap_or_default(),
                        romof: attribute(&e, b"romof")?.filter(|p| !p.is_empty()),
                        is_bios: attribute(&e, b"isbios")?.as_deref() == Some("yes"),
                        roms: Vec::new(),
                    });
                    depth = 0;
                }
            }
            Event::Empty(e) => {
                if let Some(machine) = current.as_mut() {
                    if depth == 0 && e.name().as_ref() == b"rom" {
                        machine.roms.extend(rom_element(&e)?);
                    }
                }
            }
            Event::End(_) => {
                if current.is_some() {
                    if depth == 0 {
                        machines.extend(current.take());
                    } else {
                        depth -= 1;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let bioses: HashSet<&str> = machines
        .iter()
        .filter(|m| m.is_bios)
        .map(|m| m.name.as_str())
        .collect();
    debug!(
        machines = machines.len(),
        bioses = bioses.len(),
        "Read MAME machine list"
    );

    let mut records = Vec::new();
    let ordered = machines
        .iter()
        .filter(|m| m.is_bios)
        .chain(machines.iter().filter(|m| !m.is_bios));
    for machine in ordered {
        let parent = match machine.romof.as_deref() {
            Some(parent) if machine.is_bios || !bioses.contains(parent) => Some(parent),
            _ => None,
        };
        for rom in &machine.roms {
            let (archive_id, file_name) = match parent {
                Some(parent) => (parent.to_string(), format!("{}/{}", machine.name, rom.name)),
                None => (machine.name.clone(), rom.name.clone()),
            };
            records.push(RomRecord::new(&rom.sha1, archive_id, file_name));
        }
    }

    info!(records = records.len(), "Imported MAME machine list");
    Ok(records)
}

/// Records from a software list file (`<softwarelists>` or a single
/// `<softwarelist>`).
///
/// Archives are `<list>/<software>`. A clone lives in its parent's archive,
/// under a folder named after the clone. Every named rom anywhere below a
/// `software` element counts.
pub fn import_software<R: BufRead>(reader: R) -> Result<Vec<RomRecord>, ImportError> {
    let mut reader = Reader::from_reader(reader);
    let mut buf = Vec::new();

    let mut list = String::new();
    let mut software: Option<(String, Option<String>)> = None;
    let mut roms: Vec<XmlRom> = Vec::new();
    let mut records = Vec::new();

    loop {
        buf.clear();
        match next_event(&mut reader, &mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"softwarelist" => list = attribute(&e, b"name")?.unwrap_or_default(),
                b"software" => {
                    software = Some((
                        attribute(&e, b"name")?.unwrap_or_default(),
                        attribute(&e, b"cloneof")?.filter(|p| !p.is_empty()),
                    ));
                    roms.clear();
                }
                b"rom" if software.is_some() => roms.extend(rom_element(&e)?),
                _ => {}
            },
            Event::Empty(e) => {
                if software.is_some() && e.name().as_ref() == b"rom" {
                    roms.extend(rom_element(&e)?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"software" => {
                let Some((name, cloneof)) = software.take() else {
                    continue;
                };
                let archive = cloneof.as_deref().unwrap_or(&name);
                let archive_id = if list.is_empty() {
                    archive.to_string()
                } else {
                    format!("{}/{}", list, archive)
                };
                for rom in roms.drain(..) {
                    let file_name = if cloneof.is_some() {
                        format!("{}/{}", name, rom.name)
                    } else {
                        rom.name
                    };
                    records.push(RomRecord::new(rom.sha1, archive_id.as_str(), file_name));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    info!(list = %list, records = records.len(), "Imported software list");
    Ok(records)
}

/// Write records in the flat reference format, one per line.
pub fn write_reference<'a, W, I>(records: I, mut writer: W) -> std::io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a RomRecord>,
{
    let mut count = 0;
    for record in records {
        writeln!(writer, "{}", record)?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::load_reference;

    const MAME_XML: &str = r#"<?xml version="1.0"?>
<mame build="0.222 (unknown)" debug="no" mameconfig="10">
    <machine name="18wheelr" sourcefile="naomi.cpp" romof="naomi">
        <rom name="epr-21576h.ic27" merge="epr-21576h.ic27" sha1="91424d481ff99a8d3f4c45cea6d3f0eada049a6d" />
        <rom name="epr-22185a.ic22" sha1="2f32caf3906fc1408fd8126a500e74c682ff20fa" />
    </machine>
    <machine name="18wheelro" sourcefile="naomi.cpp" cloneof="18wheelr" romof="18wheelr">
        <rom name="epr-21576h.ic27" merge="epr-21576h.ic27" sha1="91424d481ff99a8d3f4c45cea6d3f0eada049a6d" />
        <rom name="epr-22185.ic22" sha1="6db3bfa23246c250e334bbd54dcb5038a2d18dbc" />
    </machine>
    <machine name="naomi" sourcefile="naomi.cpp" isbios="yes">
        <rom name="epr-21576h.ic27" merge="epr-21576h.ic27" sha1="91424d481ff99a8d3f4c45cea6d3f0eada049a6d" />
        <rom name="epr-22185.ic22" merge="epr-22185.ic22" sha1="6db3bfa23246c250e334bbd54dcb5038a2d18dbc" />
        <rom name="epr-21576h.ic27" bios="bios0" sha1="91424d481ff99a8d3f4c45cea6d3f0eada049a6d"/>
    </machine>
</mame>"#;

    const SOFTWARE_XML: &str = r#"<?xml version="1.0"?>
<softwarelists>
    <softwarelist name="sms" description="Sega Master System cartridges">
        <software name="alexkidd">
            <part name="cart" interface="sms_cart">
                <dataarea name="rom">
                    <rom name="alex kidd in miracle world (usa, europe) (v1.1).bin" sha1="6d052e0cca3f2712434efd856f733c03011be41c"/>
                </dataarea>
            </part>
        </software>
        <software name="alexkidd1" cloneof="alexkidd">
            <part name="cart" interface="sms_cart">
                <dataarea name="rom">
                    <rom name="alex kidd in miracle world (usa, europe).bin" sha1="8cecf8ed0f765163b2657be1b0a3ce2a9cb767f4"/>
                    <rom test="no name in field list" />
                </dataarea>
            </part>
        </software>
    </softwarelist>
</softwarelists>"#;

    fn lines(records: &[RomRecord]) -> Vec<String> {
        records.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_import_mame_bios_first_and_parent_folders() {
        let records = import_mame(MAME_XML.as_bytes()).unwrap();
        assert_eq!(
            lines(&records),
            vec![
                "91424d481ff99a8d3f4c45cea6d3f0eada049a6d naomi:epr-21576h.ic27",
                "2f32caf3906fc1408fd8126a500e74c682ff20fa 18wheelr:epr-22185a.ic22",
                "6db3bfa23246c250e334bbd54dcb5038a2d18dbc 18wheelr:18wheelro/epr-22185.ic22",
            ]
        );
    }

    #[test]
    fn test_import_mame_skips_nodump_disks_and_nested_roms() {
        let xml = r#"<mame>
            <machine name="mach3" romof="parent">
                <rom name="mach3fg0.bin" sha1="7BC0B82CCAB0E4498A7A2A9DC85F03125F25826E"/>
                <rom name="missing.bin" status="nodump"/>
                <rom name="nosha.bin" status="baddump"/>
                <disk name="mach3" sha1="d0f72bded7feff5c360f8749d6c27650a6964847"/>
                <device_ref name="z80">
                    <rom name="nested.bin" sha1="1111111111111111111111111111111111111111"/>
                </device_ref>
            </machine>
        </mame>"#;
        let records = import_mame(xml.as_bytes()).unwrap();
        assert_eq!(
            lines(&records),
            vec!["7bc0b82ccab0e4498a7a2a9dc85f03125f25826e parent:mach3/mach3fg0.bin"]
        );
    }

    #[test]
    fn test_import_software_clones_and_nameless_roms() {
        let records = import_software(SOFTWARE_XML.as_bytes()).unwrap();
        assert_eq!(
            lines(&records),
            vec![
                "6d052e0cca3f2712434efd856f733c03011be41c sms/alexkidd:alex kidd in miracle world (usa, europe) (v1.1).bin",
                "8cecf8ed0f765163b2657be1b0a3ce2a9cb767f4 sms/alexkidd:alexkidd1/alex kidd in miracle world (usa, europe).bin",
            ]
        );
    }

    #[test]
    fn test_import_software_unescapes_attributes() {
        let xml = r#"<softwarelist name="nes">
            <software name="smb"><part><dataarea>
                <rom name="super mario bros. &amp; duck hunt.nes" sha1="2222222222222222222222222222222222222222"/>
            </dataarea></part></software>
        </softwarelist>"#;
        let records = import_software(xml.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].archive_id, "nes/smb");
        assert_eq!(records[0].file_name, "super mario bros. & duck hunt.nes");
    }

    #[test]
    fn test_import_malformed_xml_is_an_error() {
        let xml = r#"<mame><machine name="a"><rom name="x" sha1="1"></machine></mame>"#;
        let err = import_mame(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Syntax { .. }), "got {:?}", err);
    }

    #[test]
    fn test_written_reference_loads_back() {
        let mut records = import_mame(MAME_XML.as_bytes()).unwrap();
        records.extend(import_software(SOFTWARE_XML.as_bytes()).unwrap());

        let mut out = Vec::new();
        assert_eq!(write_reference(&records, &mut out).unwrap(), 5);

        let index = load_reference(out.as_slice()).unwrap();
        assert_eq!(index.stats().record_count, 5);
        assert_eq!(
            index
                .by_archive("sms/alexkidd")
                .map(|records| records.len()),
            Some(2)
        );
        assert!(index
            .by_checksum("6db3bfa23246c250e334bbd54dcb5038a2d18dbc")
            .is_some());
    }
}
