//! The extraction pipeline: walk folders, pick attachments, filter them,
//! lay them out on disk and keep the inventory.
//!
//! [`run::run`] is the entry point. Everything it mutates during a run
//! lives in a [`RunContext`] passed down explicitly.

pub mod folder;
pub mod layout;
pub mod limits;
pub mod report;
pub mod run;
pub mod select;

pub use run::{run, Progress};

use crate::error::{ExtractError, Result};
use crate::filter::{presets, AttachmentFilter};
use crate::parser::Decoder;
use crate::storage::Storage;

use self::limits::LimitCoordinator;

/// What to extract and how to organize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Folder to process, or the root of the tree in recursive mode.
    pub mailbox: String,
    /// Server-side search expression, e.g. `ALL` or `SINCE 1-Jan-2024`.
    pub search_criteria: String,
    pub organize_by_sender: bool,
    pub organize_by_date: bool,
    /// Process `mailbox` and every folder below it.
    pub recursive: bool,
    /// Message limit. Per folder in single-folder mode, overall in
    /// recursive mode.
    pub limit: Option<u64>,
    /// Recursive mode only.
    pub limit_per_folder: Option<u64>,
    /// Recursive mode only.
    pub total_limit: Option<u64>,
    /// `None` accepts everything not excluded. May contain `@preset` names.
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    /// Write `attachments_metadata*.json` reports.
    pub save_metadata: bool,
    /// Go through the motions without writing anything.
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mailbox: "INBOX".to_string(),
            search_criteria: "ALL".to_string(),
            organize_by_sender: false,
            organize_by_date: true,
            recursive: false,
            limit: None,
            limit_per_folder: None,
            total_limit: None,
            include: None,
            exclude: None,
            save_metadata: true,
            dry_run: false,
        }
    }
}

impl RunOptions {
    /// Reject inconsistent settings before anything touches the server.
    pub fn validate(&self) -> Result<()> {
        if self.mailbox.trim().is_empty() {
            return Err(ExtractError::config("mailbox name is empty"));
        }
        if self.search_criteria.trim().is_empty() {
            return Err(ExtractError::config("search criteria are empty"));
        }

        for (name, value) in [
            ("limit", self.limit),
            ("limit_per_folder", self.limit_per_folder),
            ("total_limit", self.total_limit),
        ] {
            if value == Some(0) {
                return Err(ExtractError::config(format!("{name} must be at least 1")));
            }
        }

        if let (Some(limit), Some(total)) = (self.limit, self.total_limit) {
            if limit != total {
                return Err(ExtractError::config(format!(
                    "limit ({limit}) and total_limit ({total}) disagree; set only one"
                )));
            }
        }

        if !self.recursive {
            if self.limit_per_folder.is_some() {
                return Err(ExtractError::config("limit_per_folder requires recursive mode"));
            }
            if self.total_limit.is_some() {
                return Err(ExtractError::config("total_limit requires recursive mode"));
            }
        }

        Ok(())
    }

    /// Budget for each folder.
    pub fn folder_limit(&self) -> Option<u64> {
        if self.recursive {
            self.limit_per_folder
        } else {
            self.limit
        }
    }

    /// Budget for the whole run.
    pub fn global_limit(&self) -> Option<u64> {
        if self.recursive {
            self.total_limit.or(self.limit)
        } else {
            None
        }
    }

    /// Expand presets and compile the include/exclude lists.
    pub fn compile_filter(&self) -> Result<AttachmentFilter> {
        let include = self.include.as_deref().map(presets::expand).transpose()?;
        let exclude = self.exclude.as_deref().map(presets::expand).transpose()?;
        Ok(AttachmentFilter::new(include.as_deref(), exclude.as_deref()))
    }
}

/// Run-wide state threaded through the pipeline.
pub struct RunContext<'a> {
    pub options: &'a RunOptions,
    pub filter: AttachmentFilter,
    pub limits: LimitCoordinator,
    pub decoder: &'a dyn Decoder,
    pub storage: &'a mut dyn Storage,
    /// Called after every message; returning `false` cancels the run.
    pub progress: &'a dyn Fn(&Progress) -> bool,
    pub cancelled: bool,
}

impl<'a> RunContext<'a> {
    /// Validate `options` and build a fresh context.
    pub fn new(
        options: &'a RunOptions,
        decoder: &'a dyn Decoder,
        storage: &'a mut dyn Storage,
        progress: &'a dyn Fn(&Progress) -> bool,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            filter: options.compile_filter()?,
            limits: LimitCoordinator::new(options.folder_limit(), options.global_limit()),
            decoder,
            storage,
            progress,
            cancelled: false,
        })
    }
}
