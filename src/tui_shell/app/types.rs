use super::*;

/// Side effects requested by the state engine. The runtime executes them off
/// the UI thread and reports back with [`AppMsg`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) enum Command {
    SyncNow,
    PersistMarks(BTreeSet<String>),
    RecordChange(ChangeRecord),
    BulkStep(StepRequest),
    LoadReadme { owner: String, name: String },
    Export(Vec<RepositorySnapshot>),
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) enum AppMsg {
    Refresh(RefreshMsg),
    BulkStepDone {
        step: StepRequest,
        result: Result<(), String>,
    },
    Readme {
        full_name: String,
        result: Result<Option<String>, String>,
    },
    Exported(Result<PathBuf, String>),
    Persisted(Result<(), String>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) enum ReadmeState {
    Loading,
    Loaded(String),
    Missing,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) enum Modal {
    Detail {
        repo: Box<RepositorySnapshot>,
        readme: ReadmeState,
        scroll: usize,
    },
    Confirm {
        kind: BulkKind,
        names: Vec<String>,
        scroll: usize,
    },
    Help,
    LanguagePicker {
        options: Vec<String>,
        selected: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) enum BannerLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::tui_shell) struct Banner {
    pub(in crate::tui_shell) level: BannerLevel,
    pub(in crate::tui_shell) text: String,
}

impl Banner {
    pub(in crate::tui_shell) fn info(text: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Info,
            text: text.into(),
        }
    }

    pub(in crate::tui_shell) fn success(text: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Success,
            text: text.into(),
        }
    }

    pub(in crate::tui_shell) fn error(text: impl Into<String>) -> Self {
        Self {
            level: BannerLevel::Error,
            text: text.into(),
        }
    }
}
