use super::*;

/// Rows taken by the header, list borders and footer.
pub(in crate::tui_shell) const CHROME_ROWS: u16 = 7;

pub(in crate::tui_shell) struct App {
    pub(in crate::tui_shell) owner: String,
    pub(in crate::tui_shell) classifier: Arc<dyn ArchiveClassifier>,

    /// Full cached set for the owner, name-ordered.
    pub(in crate::tui_shell) repos: Vec<RepositorySnapshot>,
    /// Pipeline output, with `marked`/`reason` filled in.
    pub(in crate::tui_shell) visible: Vec<RepositorySnapshot>,
    pub(in crate::tui_shell) languages: Vec<String>,
    pub(in crate::tui_shell) query: ViewQuery,
    pub(in crate::tui_shell) marks: BTreeSet<String>,

    pub(in crate::tui_shell) cursor: usize,
    pub(in crate::tui_shell) offset: usize,
    pub(in crate::tui_shell) height: usize,

    pub(in crate::tui_shell) modal: Option<Modal>,
    pub(in crate::tui_shell) bulk: BulkMachine,

    pub(in crate::tui_shell) search: Input,
    pub(in crate::tui_shell) searching: bool,

    pub(in crate::tui_shell) status: Option<Banner>,
    pub(in crate::tui_shell) syncing: bool,
    pub(in crate::tui_shell) last_sync: Option<OffsetDateTime>,

    pub(in crate::tui_shell) quit: bool,
}

impl App {
    pub(in crate::tui_shell) fn new(owner: &str, classifier: Arc<dyn ArchiveClassifier>) -> Self {
        Self {
            owner: owner.to_string(),
            classifier,
            repos: Vec::new(),
            visible: Vec::new(),
            languages: Vec::new(),
            query: ViewQuery::default(),
            marks: BTreeSet::new(),
            cursor: 0,
            offset: 0,
            height: 20,
            modal: None,
            bulk: BulkMachine::default(),
            search: Input::default(),
            searching: false,
            status: None,
            syncing: false,
            last_sync: None,
            quit: false,
        }
    }

    /// Seeds the state from the cache at startup.
    pub(in crate::tui_shell) fn with_cached(
        mut self,
        repos: Vec<RepositorySnapshot>,
        marks: BTreeSet<String>,
        last_sync: Option<OffsetDateTime>,
    ) -> Self {
        self.repos = repos;
        self.marks = marks;
        self.last_sync = last_sync;
        self.languages = pipeline::languages(&self.repos);
        self.recompute();
        self
    }

    pub(in crate::tui_shell) fn selected(&self) -> Option<&RepositorySnapshot> {
        self.visible.get(self.cursor)
    }

    pub(in crate::tui_shell) fn selected_full_name(&self) -> Option<String> {
        self.selected().map(|r| r.full_name.clone())
    }

    /// Marked repositories that exist in the current set. Marks for unknown
    /// identities stay in the set but are not acted on.
    pub(in crate::tui_shell) fn marked_repos(&self) -> Vec<RepositorySnapshot> {
        self.repos
            .iter()
            .filter(|r| self.marks.contains(&r.full_name))
            .map(|r| self.decorate(r.clone()))
            .collect()
    }

    fn decorate(&self, mut repo: RepositorySnapshot) -> RepositorySnapshot {
        repo.marked = self.marks.contains(&repo.full_name);
        let verdict = self.classifier.classify(&repo);
        repo.reason = verdict.is_candidate.then_some(verdict.reason);
        repo
    }

    /// Re-runs the pipeline and clamps the viewport.
    pub(in crate::tui_shell) fn recompute(&mut self) {
        let visible: Vec<RepositorySnapshot> = pipeline::render(&self.repos, &self.query)
            .into_iter()
            .map(|r| self.decorate(r))
            .collect();
        self.visible = visible;
        self.clamp();
    }

    /// Re-runs the pipeline keeping `full_name` selected when it is still
    /// visible.
    pub(in crate::tui_shell) fn recompute_keeping(&mut self, full_name: Option<&str>) {
        self.recompute();
        if let Some(name) = full_name
            && let Some(idx) = self.visible.iter().position(|r| r.full_name == name)
        {
            self.cursor = idx;
            self.clamp();
        }
    }

    pub(in crate::tui_shell) fn clamp(&mut self) {
        let w = pipeline::paginate(self.visible.len(), self.cursor, self.offset, self.height);
        self.cursor = w.cursor;
        self.offset = w.offset;
    }

    pub(in crate::tui_shell) fn resize(&mut self, rows: u16) {
        self.height = usize::from(rows.saturating_sub(CHROME_ROWS)).max(1);
        self.clamp();
    }

    /// Swaps in a freshly fetched set.
    pub(in crate::tui_shell) fn replace_repos(&mut self, repos: Vec<RepositorySnapshot>) {
        let keep = self.selected_full_name();
        self.repos = repos;
        self.languages = pipeline::languages(&self.repos);
        if let Some(lang) = &self.query.language
            && !self.languages.contains(lang)
        {
            self.query.language = None;
        }
        self.recompute_keeping(keep.as_deref());
    }

    pub(in crate::tui_shell) fn set_archived_local(&mut self, full_name: &str, archived: bool) {
        if let Some(r) = self.repos.iter_mut().find(|r| r.full_name == full_name) {
            r.is_archived = archived;
        }
    }

    pub(in crate::tui_shell) fn mark_change(&self, repo: &RepositorySnapshot, marked: bool) -> ChangeRecord {
        let action = if marked {
            ChangeAction::Marked
        } else {
            ChangeAction::Unmarked
        };
        ChangeRecord::new(&self.owner, &repo.name, action, Actor::User)
    }
}
