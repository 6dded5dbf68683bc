//! The ovf module parses the OVF environment document that vSphere hands to the guest through
//! `guestinfo.ovfenv`.
//!
//! Only two sections matter to us: the `PropertySection`, whose `Property` elements carry the
//! key/value settings chosen at deploy time, and the `EthernetAdapterSection`, which has one child
//! element (normally `Adapter`) per virtual NIC.
//! ```xml
//! <Environment>
//!   <PropertySection>
//!     <Property oe:key="ip0" oe:value="10.0.0.5"/>
//!   </PropertySection>
//!   <ve:EthernetAdapterSection>
//!     <ve:Adapter ve:mac="00:50:56:aa:bb:cc" ve:network="VM Network" ve:unitNumber="7"/>
//!   </ve:EthernetAdapterSection>
//! </Environment>
//! ```
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::BTreeMap;

/// Parsed guest-info properties.  Properties whose value is blank are never stored, so a present
/// key always has a non-empty value.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Properties(BTreeMap<String, String>);

impl Properties {
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Look up a per-adapter (or otherwise numbered) property such as `ip0` or `dns3`.
    pub(crate) fn indexed(&self, name: &str, index: usize) -> Option<&str> {
        self.get(&format!("{}{}", name, index))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: AsRef<str>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut properties = BTreeMap::new();
        for (key, value) in iter {
            let value = value.as_ref().trim();
            if !value.is_empty() {
                properties.insert(key.into(), value.to_string());
            }
        }
        Properties(properties)
    }
}

/// What the configurators need from the OVF environment.
#[derive(Debug, PartialEq)]
pub(crate) struct OvfEnvironment {
    pub(crate) properties: Properties,
    pub(crate) adapter_count: usize,
}

impl OvfEnvironment {
    pub(crate) fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut walker = SectionWalker::default();
        loop {
            match reader.read_event().context(error::XmlParseSnafu)? {
                Event::Start(element) => walker.open(&element)?,
                Event::Empty(element) => {
                    walker.open(&element)?;
                    walker.close();
                }
                Event::End(_) => walker.close(),
                Event::Eof => break,
                _ => {}
            }
        }
        ensure!(walker.open.is_empty(), error::UnexpectedEofSnafu);

        let properties: Properties = walker
            .properties
            .context(error::MissingSectionSnafu {
                section: PROPERTY_SECTION,
            })?
            .into_iter()
            .collect();
        for (key, value) in properties.iter() {
            info!("get prop: {} = {}", key, value);
        }

        let adapter_count = walker.adapter_count.context(error::MissingSectionSnafu {
            section: ETHERNET_ADAPTER_SECTION,
        })?;
        info!("get nics: {}", adapter_count);

        Ok(OvfEnvironment {
            properties,
            adapter_count,
        })
    }
}

// =^..^=   =^..^=   =^..^=   =^..^=

const PROPERTY_SECTION: &str = "PropertySection";
const ETHERNET_ADAPTER_SECTION: &str = "EthernetAdapterSection";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Properties,
    EthernetAdapters,
}

/// Collects the children of the first `PropertySection` and `EthernetAdapterSection` under the
/// root element.  Names are compared without their namespace prefix, so `ve:Adapter` and
/// `oe:key` match as `Adapter` and `key`.
#[derive(Debug, Default)]
struct SectionWalker {
    // Local names of the elements that are currently open, outermost first
    open: Vec<Vec<u8>>,
    reading: Option<Section>,
    properties: Option<Vec<(String, String)>>,
    adapter_count: Option<usize>,
}

impl SectionWalker {
    fn open(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let name = element.local_name();
        match self.open.len() {
            1 if name.as_ref() == PROPERTY_SECTION.as_bytes() && self.properties.is_none() => {
                self.properties = Some(Vec::new());
                self.reading = Some(Section::Properties);
            }
            1 if name.as_ref() == ETHERNET_ADAPTER_SECTION.as_bytes()
                && self.adapter_count.is_none() =>
            {
                self.adapter_count = Some(0);
                self.reading = Some(Section::EthernetAdapters);
            }
            2 => match self.reading {
                Some(Section::Properties) if name.as_ref() == b"Property" => {
                    let property = property(element)?;
                    self.properties.get_or_insert_with(Vec::new).push(property);
                }
                // Every child element is one adapter, whatever its name
                Some(Section::EthernetAdapters) => {
                    *self.adapter_count.get_or_insert(0) += 1;
                }
                _ => {}
            },
            _ => {}
        }
        self.open.push(name.as_ref().to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.open.pop();
        if self.open.len() < 2 {
            self.reading = None;
        }
    }
}

/// Read the `key` and `value` attributes of a `Property`; a missing attribute reads as empty.
fn property(element: &BytesStart<'_>) -> Result<(String, String)> {
    let mut key = String::new();
    let mut value = String::new();
    for attribute in element.attributes() {
        let attribute = attribute.context(error::XmlAttributeSnafu)?;
        let target = match attribute.key.local_name().as_ref() {
            b"key" => &mut key,
            b"value" => &mut value,
            _ => continue,
        };
        *target = attribute
            .unescape_value()
            .context(error::XmlParseSnafu)?
            .into_owned();
    }
    Ok((key, value))
}

// =^..^=   =^..^=   =^..^=   =^..^=

mod error {
    use quick_xml::events::attributes::AttrError;
    use snafu::Snafu;

    #[derive(Debug, Snafu)]
    #[snafu(visibility(pub(super)))]
    pub(crate) enum Error {
        #[snafu(display("Unable to parse OVF environment XML: {}", source))]
        XmlParse { source: quick_xml::Error },

        #[snafu(display("Invalid attribute in OVF environment XML: {}", source))]
        XmlAttribute { source: AttrError },

        #[snafu(display("OVF environment XML ended before all elements were closed"))]
        UnexpectedEof,

        #[snafu(display("OVF environment has no {} element", section))]
        MissingSection { section: &'static str },
    }
}

pub(crate) use error::Error;
type Result<T> = std::result::Result<T, error::Error>;
