//! Transcription text extraction from Blake Archive XML.
//!
//! Each XML file describes one copy of a work. Its objects (plates, pages)
//! are the `desc` elements under `objdesc`; an object's transcription is
//! the text of every `<l>` element below its `phystext` children:
//!
//! ```text
//! <objdesc>
//!   <desc id="abel.a.illbk.01">
//!     <phystext>
//!       <lg><l>Jehovah<space extent="1"/>What Vengeance dost thou require
//!           <note>editorial remark</note></l></lg>
//!     </phystext>
//!   </desc>
//! </objdesc>
//! ```
//!
//! Per line, `<note>` subtrees are dropped, each `<space/>` directly under
//! the line becomes one space, whitespace runs collapse to a single space
//! and the result is trimmed. Lines left empty are skipped. Lines are joined
//! with `\n` and the transcription carries no trailing newline.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};

const OBJECT_CONTAINER: &str = "objdesc";
const OBJECT: &str = "desc";
const PHYSICAL_TEXT: &str = "phystext";
const LINE: &str = "l";
const NOTE: &str = "note";
const SPACE: &str = "space";

#[derive(Debug, Clone)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn from_start(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Elements named `name` below `self`, in document order, nested
    /// matches included.
    fn descendants_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in self.child_elements() {
            if child.name == name {
                out.push(child);
            }
            child.descendants_named(name, out);
        }
    }
}

fn push_child(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Parse a whole XML document into a tree rooted at a synthetic element.
fn parse_tree(xml: &str) -> std::result::Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut stack = vec![Element::new("#document")];
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Element::from_start(&e)?),
            Ok(Event::Empty(e)) => {
                let el = Element::from_start(&e)?;
                push_child(&mut stack, Node::Element(el));
            }
            Ok(Event::End(e)) => {
                if stack.len() < 2 {
                    return Err(format!(
                        "unexpected closing tag </{}>",
                        String::from_utf8_lossy(e.local_name().as_ref())
                    ));
                }
                if let Some(el) = stack.pop() {
                    push_child(&mut stack, Node::Element(el));
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                push_child(&mut stack, Node::Text(text.into_owned()));
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_child(&mut stack, Node::Text(text));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    match stack.len() {
        1 => Ok(stack.remove(0)),
        _ => {
            let unclosed = stack.last().map(|el| el.name.clone()).unwrap_or_default();
            Err(format!("unclosed element <{}>", unclosed))
        }
    }
}

/// One parsed XML file: a copy in the archive.
#[derive(Debug, Clone)]
pub struct ArchiveCopy {
    path: PathBuf,
    root: Element,
}

impl ArchiveCopy {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingResource(path.to_path_buf()));
        }
        let xml = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => Error::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
            _ => Error::Io(e),
        })?;
        Self::parse(path, &xml)
    }

    /// Parse XML text; `path` is only used to label errors.
    pub fn parse(path: &Path, xml: &str) -> Result<Self> {
        let root = parse_tree(xml).map_err(|message| Error::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every `objdesc/desc` element, in document order.
    pub fn objects(&self) -> Result<Vec<ArchiveObject<'_>>> {
        let mut containers = Vec::new();
        self.root.descendants_named(OBJECT_CONTAINER, &mut containers);

        let mut objects = Vec::new();
        for container in containers {
            for el in container.child_elements().filter(|el| el.name == OBJECT) {
                let desc_id = el.attribute("id").ok_or_else(|| Error::Parse {
                    path: self.path.clone(),
                    message: "<desc> element without an id attribute".to_string(),
                })?;
                objects.push(ArchiveObject {
                    desc_id: desc_id.to_string(),
                    element: el,
                });
            }
        }
        Ok(objects)
    }
}

/// A plate, page, or other object within a copy.
#[derive(Debug, Clone)]
pub struct ArchiveObject<'a> {
    desc_id: String,
    element: &'a Element,
}

impl ArchiveObject<'_> {
    pub fn desc_id(&self) -> &str {
        &self.desc_id
    }

    /// Transcription text of the object.
    pub fn text(&self) -> String {
        let mut lines = Vec::new();
        for phystext in self
            .element
            .child_elements()
            .filter(|el| el.name == PHYSICAL_TEXT)
        {
            phystext.descendants_named(LINE, &mut lines);
        }

        let mut transcription = String::new();
        for line in lines {
            let text = normalize_whitespace(&line_text(line));
            if text.is_empty() {
                continue;
            }
            transcription.push_str(&text);
            transcription.push('\n');
        }
        transcription.trim_end().to_string()
    }

    /// Write the transcription to `<dir>/<desc_id>.txt`.
    pub fn write_text(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(format!("{}.txt", self.desc_id));
        std::fs::write(&path, self.text())?;
        Ok(path)
    }
}

/// Raw text of one line: notes dropped, direct `<space/>` children as " ".
fn line_text(line: &Element) -> String {
    let mut out = String::new();
    push_children(&line.children, &mut out, true);
    out
}

fn collect_text(el: &Element, out: &mut String) {
    if el.name == NOTE {
        return;
    }
    push_children(&el.children, out, false);
}

/// A note takes the text that follows it, up to the next sibling element,
/// along with it.
fn push_children(children: &[Node], out: &mut String, placeholders: bool) {
    let mut note_tail = false;
    for node in children {
        match node {
            Node::Text(_) if note_tail => {}
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name == NOTE => note_tail = true,
            Node::Element(el) if placeholders && el.name == SPACE => {
                note_tail = false;
                out.push(' ');
                // Only the placeholder's own leading text is replaced.
                if let Some(first) = el
                    .children
                    .iter()
                    .position(|n| matches!(n, Node::Element(_)))
                {
                    push_children(&el.children[first..], out, false);
                }
            }
            Node::Element(el) => {
                note_tail = false;
                collect_text(el, out);
            }
        }
    }
}

/// Collapse whitespace runs (source line wrapping included) to one space
/// and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Counts from [`extract_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub objects: usize,
}

/// Extract every `*.xml` file in `xml_dir` into `<desc_id>.txt` files in
/// `text_dir`. Files are processed in name order.
pub fn extract_directory(xml_dir: &Path, text_dir: &Path) -> Result<ExtractSummary> {
    if !xml_dir.is_dir() {
        return Err(Error::MissingResource(xml_dir.to_path_buf()));
    }
    std::fs::create_dir_all(text_dir)?;

    let mut summary = ExtractSummary::default();
    let walker = WalkDir::new(xml_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("xml") {
            continue;
        }

        info!(path = %path.display(), "extracting transcriptions");
        let copy = ArchiveCopy::open(path)?;
        for object in copy.objects()? {
            let written = object.write_text(text_dir)?;
            debug!(path = %written.display(), "wrote transcription");
            summary.objects += 1;
        }
        summary.files += 1;
    }
    Ok(summary)
}
