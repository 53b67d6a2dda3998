//! Raw XML record types and field parsers.
//!
//! The loader splits the document into section children and deserializes
//! every record on its own, so a malformed record only affects itself.
//! Every field is read as text first; typed conversion happens in the
//! loader.

use std::str::FromStr;

use serde::de::Error;
use serde::{Deserialize, Deserializer};

/// Deserializes blank strings as `None` and trims the rest.
///
/// Used for numeric, boolean and clock-time fields, where an empty element
/// carries no value.
pub fn deserialize_empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let result = Option::deserialize(deserializer);
    let s: Option<String> = result.map_err(D::Error::custom)?;
    Ok(s.map(|s| String::from(s.trim())).filter(|s| !s.is_empty()))
}

/// Deserializes a present text element as `Some`, even when it is empty.
///
/// Only a missing element (handled by `#[serde(default)]`) yields `None`.
pub fn deserialize_present_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(Some(String::from(s.trim())))
}

/// Parses a boolean field value.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`, case-insensitively.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses a decimal integer field value.
#[must_use]
pub fn parse_int<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

/// One child node of a section element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionNode {
    /// Child element.
    Element {
        /// Tag name.
        tag: String,
        /// The element as a standalone document.
        document: String,
    },
    /// Comment, processing instruction or non-blank text.
    Other,
}

impl SectionNode {
    /// Builds an element node from its tag and raw inner markup.
    #[must_use]
    pub fn element(tag: &str, inner: &str) -> Self {
        Self::Element {
            tag: String::from(tag),
            document: format!("<{tag}>{inner}</{tag}>"),
        }
    }
}

/// Children of the six known sections. A section that is absent has no
/// children; only the first section of each name is kept.
#[derive(Debug, Default)]
pub struct DemoSections {
    /// `<channels>` children.
    pub channels: Vec<SectionNode>,
    /// `<channelgroups>` children.
    pub channel_groups: Vec<SectionNode>,
    /// `<epg>` children.
    pub epg: Vec<SectionNode>,
    /// `<recordings>` children.
    pub recordings: Vec<SectionNode>,
    /// `<recordingsdeleted>` children.
    pub recordings_deleted: Vec<SectionNode>,
    /// `<timers>` children.
    pub timers: Vec<SectionNode>,
    /// Names of the sections already taken.
    seen: Vec<String>,
}

impl DemoSections {
    /// Stores the children of section `name` unless a section of that name
    /// was already stored. Unknown section names are ignored.
    pub fn insert(&mut self, name: &str, nodes: Vec<SectionNode>) {
        if self.seen.iter().any(|s| s == name) {
            return;
        }
        let slot = match name {
            "channels" => &mut self.channels,
            "channelgroups" => &mut self.channel_groups,
            "epg" => &mut self.epg,
            "recordings" => &mut self.recordings,
            "recordingsdeleted" => &mut self.recordings_deleted,
            "timers" => &mut self.timers,
            _ => return,
        };
        *slot = nodes;
        self.seen.push(String::from(name));
    }
}

/// `<channel>` element.
#[derive(Debug, Default, Deserialize)]
pub struct RawChannel {
    /// Display name.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub name: Option<String>,
    /// Radio flag.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub radio: Option<String>,
    /// Channel number.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub number: Option<String>,
    /// Sub-channel number.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub subnumber: Option<String>,
    /// Encryption system id.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub encryption: Option<String>,
    /// Icon path relative to the client path.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub icon: Option<String>,
    /// Stream URL.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub stream: Option<String>,
}

/// `<group>` element.
#[derive(Debug, Default, Deserialize)]
pub struct RawChannelGroup {
    /// Group name.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub name: Option<String>,
    /// Radio flag.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub radio: Option<String>,
    /// Sort position.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub position: Option<String>,
    /// Member channel positions.
    #[serde(default)]
    pub members: Option<RawMembers>,
}

/// `<members>` list of a group.
#[derive(Debug, Default, Deserialize)]
pub struct RawMembers {
    /// `<member>` values, unparsed.
    #[serde(rename = "member", default)]
    pub items: Vec<String>,
}

/// `<entry>` element of the EPG section.
#[derive(Debug, Default, Deserialize)]
pub struct RawEpgEntry {
    /// Broadcast id.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub broadcastid: Option<String>,
    /// 1-based channel position.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub channelid: Option<String>,
    /// Programme title.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub title: Option<String>,
    /// Start offset in seconds.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub start: Option<String>,
    /// End offset in seconds.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub end: Option<String>,
    /// Long description.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub plot: Option<String>,
    /// Short description.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub plotoutline: Option<String>,
    /// Series number.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub series: Option<String>,
    /// Episode number.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub episode: Option<String>,
    /// Episode title.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub episodetitle: Option<String>,
    /// Icon path.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub icon: Option<String>,
    /// Genre type.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub genretype: Option<String>,
    /// Genre sub type.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub genresubtype: Option<String>,
}

/// `<recording>` element.
#[derive(Debug, Default, Deserialize)]
pub struct RawRecording {
    /// Recording title.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub title: Option<String>,
    /// Radio flag.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub radio: Option<String>,
    /// Stream URL.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub url: Option<String>,
    /// Directory in the recordings tree.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub directory: Option<String>,
    /// Name of the source channel.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub channelname: Option<String>,
    /// Long description.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub plot: Option<String>,
    /// Short description.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub plotoutline: Option<String>,
    /// Episode title.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub episodetitle: Option<String>,
    /// Series number.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub series: Option<String>,
    /// Episode number.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub episode: Option<String>,
    /// Genre type.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub genretype: Option<String>,
    /// Genre sub type.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub genresubtype: Option<String>,
    /// Duration in seconds.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub duration: Option<String>,
    /// Recording time as `HH:MM` on the previous day.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub time: Option<String>,
}

/// `<timer>` element.
#[derive(Debug, Default, Deserialize)]
pub struct RawTimer {
    /// 1-based channel position.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub channelid: Option<String>,
    /// Numeric timer state.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub state: Option<String>,
    /// Timer title.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub title: Option<String>,
    /// Timer summary.
    #[serde(deserialize_with = "deserialize_present_string", default)]
    pub summary: Option<String>,
    /// Start as `HH:MM` today.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub starttime: Option<String>,
    /// End as `HH:MM` today.
    #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
    pub endtime: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;

    #[test]
    fn test_deserialize_empty_string_as_none() {
        // Arrange
        #[derive(Deserialize)]
        struct Test {
            #[serde(deserialize_with = "deserialize_empty_string_as_none", default)]
            value: Option<String>,
        }

        // Act & Assert
        let result: Test = quick_xml::de::from_str("<Test><value></value></Test>").unwrap();
        assert_eq!(result.value, None);

        let result: Test = quick_xml::de::from_str("<Test><value>  </value></Test>").unwrap();
        assert_eq!(result.value, None);

        let result: Test =
            quick_xml::de::from_str("<Test><value> hello </value></Test>").unwrap();
        assert_eq!(result.value.as_deref(), Some("hello"));

        let result: Test = quick_xml::de::from_str("<Test></Test>").unwrap();
        assert_eq!(result.value, None);
    }

    #[test]
    fn test_parse_bool_variants() {
        // Arrange & Act & Assert
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_parse_int() {
        // Arrange & Act & Assert
        assert_eq!(parse_int::<i32>("42"), Some(42));
        assert_eq!(parse_int::<i32>(" -1 "), Some(-1));
        assert_eq!(parse_int::<i64>("3600"), Some(3600));
        assert_eq!(parse_int::<i32>("abc"), None);
    }

    #[test]
    fn test_parse_group_members() {
        // Arrange
        let xml = r"<group>
            <name>News</name>
            <members>
                <member>1</member>
                <member>3</member>
            </members>
        </group>";

        // Act
        let group: RawChannelGroup = quick_xml::de::from_str(xml).unwrap();

        // Assert
        assert_eq!(group.name.as_deref(), Some("News"));
        let members = group.members.unwrap();
        assert_eq!(members.items.len(), 2);
        assert_eq!(members.items[1], "3");
    }

    #[test]
    fn test_deserialize_present_string() {
        // Arrange
        #[derive(Deserialize)]
        struct Test {
            #[serde(deserialize_with = "deserialize_present_string", default)]
            value: Option<String>,
        }

        // Act & Assert
        let result: Test = quick_xml::de::from_str("<Test><value></value></Test>").unwrap();
        assert_eq!(result.value.as_deref(), Some(""));

        let result: Test = quick_xml::de::from_str("<Test><value/></Test>").unwrap();
        assert_eq!(result.value.as_deref(), Some(""));

        let result: Test =
            quick_xml::de::from_str("<Test><value> hello </value></Test>").unwrap();
        assert_eq!(result.value.as_deref(), Some("hello"));

        let result: Test = quick_xml::de::from_str("<Test></Test>").unwrap();
        assert_eq!(result.value, None);
    }

    #[test]
    fn test_parse_channel_record() {
        // Arrange
        let node = SectionNode::element("channel", "<name>Two</name><radio>true</radio>");
        let SectionNode::Element { document, .. } = node else {
            panic!("expected element");
        };

        // Act
        let channel: RawChannel = quick_xml::de::from_str(&document).unwrap();

        // Assert
        assert_eq!(document, "<channel><name>Two</name><radio>true</radio></channel>");
        assert_eq!(channel.name.as_deref(), Some("Two"));
        assert_eq!(channel.radio.as_deref(), Some("true"));
        assert!(channel.stream.is_none());
    }

    #[test]
    fn test_duplicate_field_rejects_record() {
        // Arrange
        let xml = "<channel><name>B</name><name>B2</name></channel>";

        // Act
        let result = quick_xml::de::from_str::<RawChannel>(xml);

        // Assert
        assert!(result.is_err());
    }

    #[test]
    fn test_sections_keep_first_of_each_name() {
        // Arrange
        let mut sections = DemoSections::default();

        // Act
        sections.insert("timers", vec![SectionNode::Other]);
        sections.insert("timers", vec![SectionNode::Other, SectionNode::Other]);
        sections.insert("unknown", vec![SectionNode::Other]);

        // Assert
        assert_eq!(sections.timers.len(), 1);
        assert!(sections.channels.is_empty());
    }
}
