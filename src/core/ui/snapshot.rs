use crate::common::constants::UI_DUMP_FILE;
use crate::core::cmd::{cmd_ok, run_cmd_timeout_async};
use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn center(&self) -> (i32, i32) {
        ((self.left + self.right) / 2, (self.top + self.bottom) / 2)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UiNodeData {
    pub text: String,
    pub desc: String,
    pub class: String,
    pub clickable: bool,
    pub bounds: Bounds,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Flattened view hierarchy. Node 0 is a synthetic root standing in for the
/// `<hierarchy>` element, so traversal always has a single start point.
#[derive(Debug, Default)]
pub struct UiTree {
    nodes: Vec<UiNodeData>,
}

impl UiTree {
    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, id: usize) -> &UiNodeData {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Test/builder surface: append a node under `parent` and return its id.
    pub fn push(&mut self, parent: usize, data: UiNodeData) -> usize {
        let id = self.nodes.len();
        self.nodes.push(UiNodeData {
            parent: Some(parent),
            ..data
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn new() -> Self {
        Self {
            nodes: vec![UiNodeData::default()],
        }
    }
}

/// Parse a `uiautomator dump` document into a tree.
pub fn parse_hierarchy(xml: &str) -> Result<UiTree> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut tree = UiTree::new();
    let mut stack: Vec<usize> = vec![tree.root()];
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"node" => {
                let parent = *stack.last().unwrap();
                let id = tree.push(parent, node_from_attrs(&e)?);
                stack.push(id);
            }
            Ok(Event::Empty(e)) if e.name().as_ref() == b"node" => {
                let parent = *stack.last().unwrap();
                tree.push(parent, node_from_attrs(&e)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"node" => {
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e).context("Failed to parse UI hierarchy"),
        }
        buf.clear();
    }

    Ok(tree)
}

fn node_from_attrs(e: &BytesStart<'_>) -> Result<UiNodeData> {
    let mut data = UiNodeData::default();
    for attr in e.attributes() {
        let attr = attr.context("Bad attribute in UI hierarchy")?;
        let value = attr.unescape_value().context("Bad attribute value")?;
        match attr.key.as_ref() {
            b"text" => data.text = value.into_owned(),
            b"content-desc" => data.desc = value.into_owned(),
            b"class" => data.class = value.into_owned(),
            b"clickable" => data.clickable = value.as_ref() == "true",
            b"bounds" => data.bounds = parse_bounds(&value).unwrap_or_default(),
            _ => {}
        }
    }
    Ok(data)
}

/// `[left,top][right,bottom]`
fn parse_bounds(s: &str) -> Option<Bounds> {
    let s = s.strip_prefix('[')?;
    let (lt, rest) = s.split_once("][")?;
    let rb = rest.strip_suffix(']')?;
    let (l, t) = lt.split_once(',')?;
    let (r, b) = rb.split_once(',')?;
    Some(Bounds {
        left: l.parse().ok()?,
        top: t.parse().ok()?,
        right: r.parse().ok()?,
        bottom: b.parse().ok()?,
    })
}

/// Owns the dump file on disk; removal happens on drop, so the file is
/// released on every exit path out of a snapshot's lifetime.
struct DumpFile(PathBuf);

impl Drop for DumpFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// One captured view hierarchy.
pub struct UiSnapshot {
    _dump: DumpFile,
    pub tree: UiTree,
}

impl UiSnapshot {
    pub async fn acquire() -> Result<Self> {
        let path = PathBuf::from(UI_DUMP_FILE);
        let guard = DumpFile(path.clone());

        let out = run_cmd_timeout_async(
            "/system/bin/uiautomator",
            &["dump", UI_DUMP_FILE],
            5000,
        )
        .await?;
        if !cmd_ok(&out) {
            bail!(
                "uiautomator dump failed: {}",
                String::from_utf8_lossy(&out.stdout).trim()
            );
        }

        let xml = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let tree = parse_hierarchy(&xml)?;

        Ok(Self { _dump: guard, tree })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="0">
  <node index="0" text="" class="android.widget.FrameLayout" content-desc="" clickable="false" bounds="[0,0][1920,1080]">
    <node index="0" text="" class="android.view.ViewGroup" content-desc="Playback controls" clickable="true" bounds="[760,900][1160,1020]">
      <node index="0" text="" class="android.widget.ImageView" content-desc="Pause" clickable="false" bounds="[920,930][1000,990]" />
    </node>
    <node index="1" text="Settings" class="android.widget.TextView" content-desc="" clickable="true" bounds="[0,0][200,80]" />
  </node>
</hierarchy>
"#;

    #[test]
    fn parses_nested_nodes_with_parents() {
        let tree = parse_hierarchy(DUMP).unwrap();
        // synthetic root + 4 real nodes
        assert_eq!(tree.len(), 5);

        let frame = tree.node(1);
        assert_eq!(frame.class, "android.widget.FrameLayout");
        assert_eq!(frame.children.len(), 2);

        let pause = tree.node(3);
        assert_eq!(pause.desc, "Pause");
        assert!(!pause.clickable);
        assert_eq!(pause.parent, Some(2));
        assert!(tree.node(2).clickable);
    }

    #[test]
    fn bounds_parse_and_center() {
        let b = parse_bounds("[760,900][1160,1020]").unwrap();
        assert_eq!(b.center(), (960, 960));
        assert!(parse_bounds("[x,0][1,2]").is_none());
        assert!(parse_bounds("garbage").is_none());
    }

    #[test]
    fn empty_hierarchy_is_just_the_root() {
        let tree = parse_hierarchy("<hierarchy rotation=\"0\"></hierarchy>").unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn dump_file_guard_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.xml");
        std::fs::write(&path, "<hierarchy/>").unwrap();

        drop(DumpFile(path.clone()));
        assert!(!path.exists());
    }
}
