use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use time::OffsetDateTime;

use crate::bulk::{Advance, BulkKind, BulkMachine, StepRequest};
use crate::classify::ArchiveClassifier;
use crate::model::{Actor, ChangeAction, ChangeRecord, RepositorySnapshot};
use crate::pipeline::{self, ViewQuery};
use crate::refresh::RefreshMsg;

use super::input::Input;
use super::modal;
use super::view::RenderCtx;

mod event_loop;
mod key_dispatch;
mod messages;
mod nav;
mod render;
mod runtime;
mod state;
mod time_utils;
mod types;

pub(in crate::tui_shell) use self::key_dispatch::{cancel_bulk, confirm_bulk, handle_key};
pub(in crate::tui_shell) use self::messages::handle_msg;
pub(super) use self::runtime::run;
pub(in crate::tui_shell) use self::state::App;
pub(in crate::tui_shell) use self::time_utils::{fmt_since, fmt_ts_day};
pub(in crate::tui_shell) use self::types::{AppMsg, Banner, BannerLevel, Command, Modal, ReadmeState};

#[cfg(test)]
#[path = "../tests/tui_shell/app_tests.rs"]
mod tests;
