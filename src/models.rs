//! Wire records exchanged with the Superfastmatch service.
//!
//! A [`DocumentRecord`] is the JSON body of `GET /document/<doctype>/<docid>/`.
//! Only the fields the pipeline reads are typed; everything else lands in the
//! `extra` maps and is written back unchanged by [`crate::document::Document::write_json`].
//! Integer fields accept either JSON numbers or numeric strings.

use serde::de::{self, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Full record for one document, including its match table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DocumentRecord {
    #[serde(deserialize_with = "flex_u64")]
    pub doctype: u64,
    #[serde(deserialize_with = "flex_u64")]
    pub docid: u64,
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<MatchTable>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentRecord {
    /// Match rows of this record; empty when the record carries no table.
    pub fn match_rows(&self) -> &[MatchRow] {
        self.documents
            .as_ref()
            .map(|table| table.rows.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct MatchTable {
    #[serde(default)]
    pub rows: Vec<MatchRow>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One counterpart document sharing fragments with the primary.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MatchRow {
    #[serde(deserialize_with = "flex_u64")]
    pub doctype: u64,
    #[serde(deserialize_with = "flex_u64")]
    pub docid: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(
        default,
        deserialize_with = "flex_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub characters: Option<u64>,
    #[serde(
        default,
        deserialize_with = "flex_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub fragment_count: Option<u64>,
    #[serde(default)]
    pub fragments: Vec<FragmentSpec>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `[primary_start, match_start, length, hash]` as sent by the service.
///
/// Offsets count characters, not bytes. They are kept signed so a negative
/// value decodes and simply locates no text. The hash is carried through but
/// never checked against the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentSpec {
    pub primary_start: i64,
    pub match_start: i64,
    pub length: i64,
    pub hash: u64,
}

impl<'de> Deserialize<'de> for FragmentSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let [primary_start, match_start, length, hash] =
            <[FlexInt; 4]>::deserialize(deserializer)?;
        Ok(FragmentSpec {
            primary_start: primary_start.signed::<D::Error>()?,
            match_start: match_start.signed::<D::Error>()?,
            length: length.signed::<D::Error>()?,
            hash: hash.unsigned::<D::Error>()?,
        })
    }
}

impl Serialize for FragmentSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeTuple;

        let mut tuple = serializer.serialize_tuple(4)?;
        tuple.serialize_element(&self.primary_start)?;
        tuple.serialize_element(&self.match_start)?;
        tuple.serialize_element(&self.length)?;
        tuple.serialize_element(&self.hash)?;
        tuple.end()
    }
}

/// An integer that may arrive as a JSON number or as its decimal text.
#[derive(Debug, Clone, Copy)]
struct FlexInt(i128);

impl FlexInt {
    fn unsigned<E: de::Error>(self) -> Result<u64, E> {
        u64::try_from(self.0)
            .map_err(|_| E::custom(format!("expected a non-negative integer, got {}", self.0)))
    }

    fn signed<E: de::Error>(self) -> Result<i64, E> {
        i64::try_from(self.0)
            .map_err(|_| E::custom(format!("integer out of range: {}", self.0)))
    }
}

impl<'de> Deserialize<'de> for FlexInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Unsigned(n) => Ok(FlexInt(n.into())),
            Raw::Signed(n) => Ok(FlexInt(n.into())),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(FlexInt)
                .map_err(|_| D::Error::custom(format!("expected an integer, got {:?}", s))),
        }
    }
}

fn flex_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    FlexInt::deserialize(deserializer)?.unsigned()
}

fn flex_opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<FlexInt>::deserialize(deserializer)?
        .map(FlexInt::unsigned)
        .transpose()
}

/// One page of the document listing.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPage {
    #[serde(default)]
    pub rows: Vec<DocumentRef>,
    #[serde(default)]
    pub cursors: Cursors,
}

impl DocumentPage {
    /// Cursor for the following page, or `None` on the last page.
    pub fn next_cursor(&self) -> Option<&str> {
        match self.cursors.next.as_str() {
            "" => None,
            token => Some(token),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub next: String,
}

/// Identity of a listed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DocumentRef {
    #[serde(deserialize_with = "flex_u64")]
    pub doctype: u64,
    #[serde(deserialize_with = "flex_u64")]
    pub docid: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "doctype": 1,
            "docid": 89,
            "title": "vda.h.illbk.07.txt",
            "text": "Wave shadows of discontent",
            "characters": 1498,
            "documents": {
                "rows": [{
                    "doctype": 1,
                    "docid": "199",
                    "title": "vda.g.illbk.07.txt",
                    "group": "fixtures/blake/Transcriptions",
                    "characters": 1498,
                    "fragment_count": 1,
                    "fragments": [[28, "30", "370", 4200547186u64]]
                }],
                "metaData": {"fields": ["doctype", "docid"]}
            },
            "success": true
        })
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let record: DocumentRecord = serde_json::from_value(sample()).unwrap();
        let row = &record.match_rows()[0];
        assert_eq!(row.docid, 199);
        assert_eq!(
            row.fragments[0],
            FragmentSpec {
                primary_start: 28,
                match_start: 30,
                length: 370,
                hash: 4_200_547_186,
            }
        );
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let record: DocumentRecord = serde_json::from_value(sample()).unwrap();
        assert_eq!(record.extra["success"], json!(true));
        assert_eq!(record.extra["characters"], json!(1498));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["success"], json!(true));
        assert_eq!(
            back["documents"]["metaData"],
            json!({"fields": ["doctype", "docid"]})
        );
        assert_eq!(
            back["documents"]["rows"][0]["fragments"],
            json!([[28, 30, 370, 4200547186u64]])
        );
    }

    #[test]
    fn record_without_match_table_has_no_rows() {
        let record: DocumentRecord =
            serde_json::from_value(json!({"doctype": 1, "docid": 2, "title": "a.b.txt"})).unwrap();
        assert!(record.match_rows().is_empty());
        assert!(!serde_json::to_value(&record)
            .unwrap()
            .as_object()
            .unwrap()
            .contains_key("documents"));
    }

    #[test]
    fn non_numeric_offset_is_rejected() {
        let err = serde_json::from_value::<FragmentSpec>(json!([1, "x", 3, 4])).unwrap_err();
        assert!(err.to_string().contains("expected an integer"));
    }

    #[test]
    fn negative_offsets_decode() {
        let record: DocumentRecord = serde_json::from_value(json!({
            "doctype": 1,
            "docid": 2,
            "title": "a.b.c.d.txt",
            "documents": {"rows": [{"doctype": 1, "docid": 3, "fragments": [[0, -3, 3, 1]]}]}
        }))
        .unwrap();
        assert_eq!(record.match_rows()[0].fragments[0].match_start, -3);
        assert_eq!(
            serde_json::to_value(record.match_rows()[0].fragments[0]).unwrap(),
            json!([0, -3, 3, 1])
        );
    }

    #[test]
    fn negative_docid_is_rejected() {
        let err = serde_json::from_value::<DocumentRef>(json!({"doctype": 1, "docid": -4}))
            .unwrap_err();
        assert!(err.to_string().contains("expected a non-negative integer"));
    }

    #[test]
    fn fragment_needs_four_elements() {
        assert!(serde_json::from_value::<FragmentSpec>(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn empty_cursor_ends_pagination() {
        let page: DocumentPage = serde_json::from_value(json!({
            "rows": [{"doctype": 1, "docid": 3}],
            "cursors": {"next": "", "previous": "abc"}
        }))
        .unwrap();
        assert_eq!(page.rows, vec![DocumentRef { doctype: 1, docid: 3 }]);
        assert_eq!(page.next_cursor(), None);
    }
}
