use crate::dependency::Dependency;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Use a child's declared version as-is when it names one concrete
    /// release, instead of reconciling it against the run.
    pub trust_declared_versions: bool,
    /// Drop repeated identities from the output, keeping first occurrences.
    pub dedupe: bool,
}

/// One level of the expansion: the list being walked plus what it has
/// produced so far. Reconciliation reads these views; they are only ever
/// appended to.
#[derive(Debug)]
pub(crate) struct Frame {
    pub worklist: Vec<Dependency>,
    pub cursor: usize,
    pub subtree: Vec<Dependency>,
    pub leaves: Vec<Dependency>,
    /// Identity of the dependency whose children this frame walks.
    pub expanding: Option<String>,
}

impl Frame {
    pub fn new(worklist: Vec<Dependency>, expanding: Option<String>) -> Self {
        Frame {
            worklist: worklist
                .into_iter()
                .filter(|dependency| !dependency.is_excluded())
                .collect(),
            cursor: 0,
            subtree: Vec::new(),
            leaves: Vec::new(),
            expanding,
        }
    }

    pub fn next(&mut self) -> Option<Dependency> {
        let dependency = self.worklist.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(dependency)
    }

    /// Scan order within one level.
    pub fn views(&self) -> [&[Dependency]; 3] {
        [&self.subtree, &self.leaves, &self.worklist]
    }

    /// subtree results, then leaves, then the walked list itself.
    pub fn finish(self) -> Vec<Dependency> {
        let mut output = self.subtree;
        output.extend(self.leaves);
        output.extend(self.worklist);
        output
    }
}
