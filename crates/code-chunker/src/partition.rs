use crate::types::{Classification, StructuralUnit, UnitId};

/// A chunk under construction: a byte range plus the units it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Draft {
    pub start: usize,
    pub end: usize,
    pub members: Vec<UnitId>,
    pub generated: bool,
    /// Nothing may be appended, not even gap bytes
    sealed: bool,
    /// Whether sibling units may still merge in
    accepts_units: bool,
    /// End of the last member unit; gap bytes after it form the trailing run
    unit_end: Option<usize>,
}

impl Draft {
    fn gap(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            members: Vec::new(),
            generated: false,
            sealed: false,
            accepts_units: true,
            unit_end: None,
        }
    }

    fn unit(unit: &StructuralUnit) -> Self {
        Self {
            start: unit.span.start,
            end: unit.span.end,
            members: vec![unit.id],
            generated: false,
            sealed: false,
            accepts_units: true,
            unit_end: Some(unit.span.end),
        }
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    fn trailing_gap(&self) -> usize {
        self.end - self.unit_end.unwrap_or(self.start)
    }
}

/// Greedy depth-first packer turning a boundary tree into a total partition
struct Assembler<'a> {
    content: &'a [u8],
    classifications: &'a [Classification],
    target: usize,
    max: usize,
    drafts: Vec<Draft>,
}

/// Partition `[0, content.len())` into drafts along the boundary tree
pub(crate) fn partition(
    content: &[u8],
    root: &StructuralUnit,
    classifications: &[Classification],
    target: usize,
    max: usize,
) -> Vec<Draft> {
    let mut assembler = Assembler {
        content,
        classifications,
        target,
        max,
        drafts: Vec::new(),
    };
    assembler.walk(root);
    assembler.drafts
}

impl Assembler<'_> {
    fn is_generated(&self, id: UnitId) -> bool {
        self.classifications
            .get(id.0)
            .is_some_and(Classification::is_generated)
    }

    fn open_draft(&mut self) -> Option<&mut Draft> {
        self.drafts.last_mut().filter(|draft| !draft.sealed)
    }

    fn walk(&mut self, unit: &StructuralUnit) {
        let mut cursor = unit.span.start;
        for child in &unit.children {
            let span = child.span;
            if span.start < cursor || span.end > unit.span.end || span.start >= span.end {
                log::warn!(
                    "skipping malformed {} unit at {}..{} inside {}..{}",
                    child.kind.as_str(),
                    span.start,
                    span.end,
                    unit.span.start,
                    unit.span.end
                );
                continue;
            }
            self.push_gap(cursor, span.start);
            self.place(child);
            cursor = span.end;
        }
        self.push_gap(cursor, unit.span.end);
    }

    fn place(&mut self, unit: &StructuralUnit) {
        if self.is_generated(unit.id) {
            self.push_generated(unit);
        } else if unit.atomic {
            self.push_isolated(unit);
        } else if !unit.children.is_empty()
            && (unit.span.len() > self.max || unit.has_atomic_descendant())
        {
            self.enter_level();
            self.walk(unit);
            self.leave_level();
        } else {
            self.push_unit(unit);
        }
    }

    /// Gap bytes, one line at a time
    fn push_gap(&mut self, start: usize, end: usize) {
        let mut pos = start;
        while pos < end {
            let seg_end = self.content[pos..end]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(end, |idx| pos + idx + 1);
            let target = self.target;
            match self.open_draft() {
                Some(draft) if draft.trailing_gap() + (seg_end - pos) <= target => {
                    draft.end = seg_end;
                }
                _ => self.drafts.push(Draft::gap(pos, seg_end)),
            }
            pos = seg_end;
        }
    }

    fn push_unit(&mut self, unit: &StructuralUnit) {
        let (target, max) = (self.target, self.max);
        let len = unit.span.len();
        match self.open_draft() {
            Some(draft)
                if draft.accepts_units
                    && !draft.generated
                    && if draft.members.is_empty() {
                        draft.len() + len <= max
                    } else {
                        draft.len() + len <= target
                    } =>
            {
                draft.end = unit.span.end;
                draft.members.push(unit.id);
                draft.unit_end = Some(unit.span.end);
            }
            _ => self.drafts.push(Draft::unit(unit)),
        }
    }

    /// Generated units stand alone, taking only a gap-only prefix with them
    fn push_generated(&mut self, unit: &StructuralUnit) {
        match self.open_draft() {
            Some(draft) if draft.members.is_empty() && !draft.generated => {
                draft.end = unit.span.end;
                draft.members.push(unit.id);
                draft.unit_end = Some(unit.span.end);
                draft.generated = true;
                draft.accepts_units = false;
            }
            _ => self.drafts.push(Draft {
                generated: true,
                accepts_units: false,
                ..Draft::unit(unit)
            }),
        }
    }

    /// Long lines become sealed chunks of their own
    fn push_isolated(&mut self, unit: &StructuralUnit) {
        self.drafts.push(Draft {
            sealed: true,
            accepts_units: false,
            ..Draft::unit(unit)
        });
    }

    fn enter_level(&mut self) {
        if let Some(draft) = self.open_draft() {
            if !draft.members.is_empty() {
                draft.sealed = true;
            }
        }
    }

    fn leave_level(&mut self) {
        if let Some(draft) = self.open_draft() {
            draft.accepts_units = false;
        }
    }
}
