use crate::line_index::LineIndex;
use crate::types::{StructuralUnit, UnitId, UnitKind};

#[derive(Debug)]
struct Node {
    kind: UnitKind,
    name: Option<String>,
    start: usize,
    end: usize,
    atomic: bool,
    children: Vec<Node>,
}

#[derive(Debug)]
struct Frame {
    kind: UnitKind,
    name: Option<String>,
    start: usize,
    /// Children may not start before this offset
    content_start: usize,
    /// End of the last attached child
    last_end: usize,
    /// Frames opened on long lines nest but produce no unit
    opaque: bool,
    /// Scanner-owned value restored when the frame closes
    aux: usize,
    children: Vec<Node>,
}

/// Incremental builder of the boundary tree.
///
/// Scanners open and close frames as they see delimiters; the builder clamps
/// every unit so siblings never overlap and children stay inside parents.
#[derive(Debug)]
pub(super) struct TreeBuilder {
    frames: Vec<Frame>,
    len: usize,
}

impl TreeBuilder {
    pub(super) fn new(len: usize) -> Self {
        Self {
            frames: vec![Frame {
                kind: UnitKind::File,
                name: None,
                start: 0,
                content_start: 0,
                last_end: 0,
                opaque: false,
                aux: 0,
                children: Vec::new(),
            }],
            len,
        }
    }

    /// Nesting depth; the file itself is depth 0
    pub(super) fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Scanner value of the innermost frame, `None` at file level
    pub(super) fn top_aux(&self) -> Option<usize> {
        if self.frames.len() > 1 {
            self.frames.last().map(|frame| frame.aux)
        } else {
            None
        }
    }

    fn innermost_real(&mut self) -> &mut Frame {
        let idx = self
            .frames
            .iter()
            .rposition(|frame| !frame.opaque)
            .unwrap_or(0);
        &mut self.frames[idx]
    }

    /// Earliest offset a new unit may start at, given where it would like to
    fn clamp_start(&mut self, wanted: usize) -> usize {
        let parent = self.innermost_real();
        wanted.max(parent.last_end).max(parent.content_start)
    }

    pub(super) fn open(
        &mut self,
        kind: UnitKind,
        name: Option<String>,
        lead_start: usize,
        content_start: usize,
        aux: usize,
    ) {
        let start = self.clamp_start(lead_start);
        self.frames.push(Frame {
            kind,
            name,
            start,
            content_start: content_start.max(start),
            last_end: start,
            opaque: false,
            aux,
            children: Vec::new(),
        });
    }

    pub(super) fn open_opaque(&mut self, aux: usize) {
        self.frames.push(Frame {
            kind: UnitKind::Block,
            name: None,
            start: 0,
            content_start: 0,
            last_end: 0,
            opaque: true,
            aux,
            children: Vec::new(),
        });
    }

    /// Close the innermost frame at `end`. The file frame is never closed here.
    pub(super) fn close(&mut self, end: usize) {
        if self.frames.len() <= 1 {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if frame.opaque {
            return;
        }
        let end = end.min(self.len);
        let mut children = frame.children;
        children.retain(|child| child.end <= end);
        self.attach(Node {
            kind: frame.kind,
            name: frame.name,
            start: frame.start,
            end,
            atomic: false,
            children,
        });
    }

    /// Add a childless unit to the innermost real frame
    pub(super) fn leaf(
        &mut self,
        kind: UnitKind,
        name: Option<String>,
        lead_start: usize,
        end: usize,
        atomic: bool,
    ) {
        let start = self.clamp_start(lead_start);
        self.attach(Node {
            kind,
            name,
            start,
            end: end.min(self.len),
            atomic,
            children: Vec::new(),
        });
    }

    fn attach(&mut self, node: Node) {
        let parent = self.innermost_real();
        if node.start >= node.end || node.start < parent.last_end {
            log::debug!(
                "dropping degenerate {} unit at {}..{}",
                node.kind.as_str(),
                node.start,
                node.end
            );
            return;
        }
        parent.last_end = node.end;
        parent.children.push(node);
    }

    /// Close everything left open at end of file and number the tree
    pub(super) fn finish(mut self, lines: &LineIndex) -> StructuralUnit {
        while self.frames.len() > 1 {
            self.close(self.len);
        }
        let root = match self.frames.pop() {
            Some(frame) => Node {
                kind: UnitKind::File,
                name: None,
                start: 0,
                end: self.len,
                atomic: false,
                children: frame.children,
            },
            None => Node {
                kind: UnitKind::File,
                name: None,
                start: 0,
                end: self.len,
                atomic: false,
                children: Vec::new(),
            },
        };
        let mut next_id = 0;
        number(root, lines, &mut next_id)
    }
}

fn number(node: Node, lines: &LineIndex, next_id: &mut usize) -> StructuralUnit {
    let id = UnitId(*next_id);
    *next_id += 1;
    let span = lines.span(node.start, node.end);
    let children = node
        .children
        .into_iter()
        .map(|child| number(child, lines, next_id))
        .collect();
    StructuralUnit {
        id,
        kind: node.kind,
        span,
        name: node.name,
        atomic: node.atomic,
        children,
    }
}
