use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use smallvec::SmallVec;

use crate::foundation::core::Size;
use crate::foundation::format::fmt3;

/// Reserved terminal video label.
pub const VIDEO_OUT: &str = "outv";
/// Reserved terminal audio label.
pub const AUDIO_OUT: &str = "outa";

/// Filter names accepted as an operation even without `=` arguments.
const OPERATION_TOKENS: &[&str] = &[
    "trim",
    "setpts",
    "overlay",
    "drawtext",
    "scale",
    "rotate",
    "subtitles",
    "ass",
    "colorchannelmixer",
    "format",
    "color",
    "negate",
    "edgedetect",
    "copy",
    "null",
    "concat",
    "atrim",
    "asetpts",
    "adelay",
    "aresample",
    "aformat",
    "aevalsrc",
    "acopy",
    "anull",
    "amix",
];

/// One engine filter with its option string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Filter {
    name: String,
    args: Option<String>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: None,
        }
    }

    pub fn with_args(name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Some(args.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> Option<&str> {
        self.args.as_deref()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.args {
            Some(args) => write!(f, "{}={}", self.name, args),
            None => f.write_str(&self.name),
        }
    }
}

pub type Labels = SmallVec<[String; 2]>;

/// One node declaration: `[in...]filter,filter,...[out...]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeDecl {
    pub inputs: Labels,
    pub filters: Vec<Filter>,
    pub outputs: Labels,
}

impl NodeDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, label: impl Into<String>) -> Self {
        self.inputs.push(label.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn output(mut self, label: impl Into<String>) -> Self {
        self.outputs.push(label.into());
        self
    }

    /// `true` when the serialized node contains an actual operation.
    pub fn is_valid(&self) -> bool {
        !self.filters.iter().any(|f| f.name.trim().is_empty())
            && is_valid_segment(&self.to_string())
    }

    /// `true` when the node's first filter is the named one.
    pub fn starts_with(&self, name: &str) -> bool {
        self.filters.first().is_some_and(|f| f.name == name)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name == name)
    }
}

impl fmt::Display for NodeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for l in &self.inputs {
            write!(f, "[{l}]")?;
        }
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{filter}")?;
        }
        for l in &self.outputs {
            write!(f, "[{l}]")?;
        }
        Ok(())
    }
}

/// Remove every `[label]` reference from a serialized graph segment.
pub fn strip_labels(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut depth = 0usize;
    for ch in segment.chars() {
        match ch {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out
}

/// `true` when a serialized segment still contains an operation once labels are stripped.
pub fn is_valid_segment(segment: &str) -> bool {
    let body = strip_labels(segment);
    let body = body.trim();
    if body.is_empty() || body == ";" {
        return false;
    }
    body.contains('=')
        || body
            .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .any(|tok| OPERATION_TOKENS.contains(&tok))
}

/// An engine input, addressed by its index in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphInput {
    File(PathBuf),
    /// A still image looped for `duration` seconds.
    LoopedImage { path: PathBuf, duration: f64 },
}

impl GraphInput {
    pub fn path(&self) -> &Path {
        match self {
            Self::File(p) => p,
            Self::LoopedImage { path, .. } => path,
        }
    }

    /// Engine arguments declaring this input.
    pub fn to_args(&self) -> Vec<OsString> {
        match self {
            Self::File(p) => vec!["-i".into(), p.clone().into_os_string()],
            Self::LoopedImage { path, duration } => vec![
                "-loop".into(),
                "1".into(),
                "-t".into(),
                fmt3(*duration).into(),
                "-i".into(),
                path.clone().into_os_string(),
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum InputKey {
    File(PathBuf),
    Image(PathBuf),
}

/// Distinct engine inputs in first-seen order.
#[derive(Debug, Default)]
pub(crate) struct InputTable {
    inputs: Vec<GraphInput>,
    index: HashMap<InputKey, usize>,
}

impl InputTable {
    pub(crate) fn file(&mut self, path: &Path) -> usize {
        let key = InputKey::File(path.to_path_buf());
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.inputs.len();
        self.inputs.push(GraphInput::File(path.to_path_buf()));
        self.index.insert(key, i);
        i
    }

    pub(crate) fn looped_image(&mut self, path: &Path, duration: f64) -> usize {
        let key = InputKey::Image(path.to_path_buf());
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.inputs.len();
        self.inputs.push(GraphInput::LoopedImage {
            path: path.to_path_buf(),
            duration,
        });
        self.index.insert(key, i);
        i
    }

    pub(crate) fn into_inputs(self) -> Vec<GraphInput> {
        self.inputs
    }
}

/// Accumulates validated node declarations in emission order.
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    nodes: Vec<NodeDecl>,
    dropped: usize,
}

impl GraphBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append `node` if it is valid. Invalid nodes are logged and dropped.
    pub(crate) fn push(&mut self, node: NodeDecl) -> bool {
        self.push_all(vec![node])
    }

    /// Append every node, or none of them if any is invalid.
    pub(crate) fn push_all(&mut self, nodes: Vec<NodeDecl>) -> bool {
        if let Some(bad) = nodes.iter().find(|n| !n.is_valid()) {
            tracing::warn!(node = %bad, "dropping graph segment without an operation");
            self.dropped += 1;
            return false;
        }
        self.nodes.extend(nodes);
        true
    }

    /// Rename the last output named `from` to `to`.
    pub(crate) fn rename_output(&mut self, from: &str, to: &str) -> bool {
        for node in self.nodes.iter_mut().rev() {
            if let Some(l) = node.outputs.iter_mut().find(|l| l.as_str() == from) {
                *l = to.to_owned();
                return true;
            }
        }
        false
    }

    pub(crate) fn dropped(&self) -> usize {
        self.dropped
    }

    pub(crate) fn into_nodes(self) -> Vec<NodeDecl> {
        self.nodes
    }
}

/// Result of graph compilation: engine inputs plus the ordered node declarations.
#[derive(Clone, Debug)]
pub struct CompiledGraph {
    pub inputs: Vec<GraphInput>,
    pub nodes: Vec<NodeDecl>,
    /// `true` when an audio output labeled [`AUDIO_OUT`] exists.
    pub has_audio: bool,
    pub size: Size,
    pub fps: u32,
    pub duration: f64,
}

impl CompiledGraph {
    /// Canonical serialized form: node declarations joined by `;`.
    pub fn filter_complex(&self) -> String {
        self.nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn video_label(&self) -> &'static str {
        VIDEO_OUT
    }

    pub fn audio_label(&self) -> Option<&'static str> {
        self.has_audio.then_some(AUDIO_OUT)
    }

    /// Index of the first node matching `pred`.
    pub fn position_of(&self, pred: impl Fn(&NodeDecl) -> bool) -> Option<usize> {
        self.nodes.iter().position(pred)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/graph/node.rs"]
mod tests;
