//! Interactive resolution of duplicate groups.
//!
//! # Overview
//!
//! The [`Resolver`] walks the duplicate groups in descending-waste order as a
//! small state machine:
//!
//! ```text
//! Reviewing(i) --n--> Reviewing(i + 1 mod len)
//! Reviewing(i) --p--> Reviewing(i - 1 mod len)
//! Reviewing(i) --q--> Quit
//! Reviewing(i) --D--> delete every member, drop group, Reviewing(i)
//! Reviewing(i) --k--> delete every member but k, drop group, Reviewing(i)
//! Reviewing(_) with no groups left --> Done
//! ```
//!
//! Each time a group comes up it is re-verified against the disk first. A
//! group left with fewer than two members is dropped without asking.
//!
//! Decisions come from a [`Chooser`]; everything worth telling the user
//! goes to a [`ResolutionObserver`].

pub mod prompt;

use std::io;

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::{delete_node, DeleteConfig, DeleteError, DeleteResult};
use crate::duplicates::{FinderError, Fingerprinter, Registry, ReverifyEvent};
use crate::scanner::{ContentHash, NodeId, Tree};

pub use prompt::{ChoiceOption, Chooser, DialoguerChooser, LineChooser, ScriptedChooser};

/// Prompt shown with every option list.
pub const PROMPT: &str = "Please select an option";

/// Errors that end the resolution loop.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    /// The chooser returned a key that was not offered.
    #[error("Invalid choice '{0}'")]
    InvalidChoice(String),

    /// The chooser ran out of answers.
    #[error("No more input")]
    EndOfInput,

    /// Reading or writing the prompt failed.
    #[error("Prompt failed: {0}")]
    Prompt(#[source] io::Error),

    /// Reverification hit an error that aborts the run.
    #[error(transparent)]
    Finder(#[from] FinderError),
}

/// Position of the resolution loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Looking at the group at this index of the review list
    Reviewing(usize),
    /// No groups left
    Done,
    /// The user quit
    Quit,
}

/// Receiver of everything the loop reports.
///
/// All methods default to doing nothing.
pub trait ResolutionObserver {
    /// A group is about to be reviewed (`position` is 1-based).
    fn on_group(&mut self, _position: usize, _total: usize, _hash: &ContentHash, _copies: usize, _duplicated: u64) {}

    /// Reverification reported something about a member.
    fn on_reverify(&mut self, _event: &ReverifyEvent) {}

    /// An entry was removed.
    fn on_deleted(&mut self, _result: &DeleteResult) {}

    /// A member could not be removed.
    fn on_delete_failed(&mut self, _error: &DeleteError) {}

    /// The loop ended in `state`.
    fn on_finish(&mut self, _state: State) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct SilentObserver;

impl ResolutionObserver for SilentObserver {}

/// Observer that prints to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl ResolutionObserver for ConsoleObserver {
    fn on_group(&mut self, position: usize, total: usize, hash: &ContentHash, copies: usize, duplicated: u64) {
        println!();
        println!(
            "{}: [{}] ({} copies, {} duplicated)",
            format!("{position}/{total}").bold(),
            hash,
            copies,
            ByteSize::b(duplicated).yellow()
        );
    }

    fn on_reverify(&mut self, event: &ReverifyEvent) {
        let path = event.path().display();
        match event {
            ReverifyEvent::Vanished { .. } => println!("\"{path}\" {}", "no longer exists".dim()),
            ReverifyEvent::Changed { .. } => println!("\"{path}\" {}", "hash has changed".yellow()),
            ReverifyEvent::Failed { error, .. } => {
                println!("\"{path}\" {}: {error}", "could not be verified".red());
            }
        }
    }

    fn on_deleted(&mut self, result: &DeleteResult) {
        let verb = if result.trashed { "trashed" } else { "deleted" };
        println!("{} \"{}\"", verb.red(), result.path.display());
    }

    fn on_delete_failed(&mut self, error: &DeleteError) {
        println!("{} {error}", "failed:".red().bold());
    }

    fn on_finish(&mut self, state: State) {
        match state {
            State::Quit => println!("quit"),
            State::Done => println!("{}", "done".green()),
            State::Reviewing(_) => {}
        }
    }
}

/// Totals for one resolution session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Groups resolved by a delete decision
    pub groups_resolved: usize,
    /// Entries removed, directory contents included
    pub entries_deleted: usize,
    /// Bytes freed by removed group members
    pub bytes_freed: u64,
    /// Members that could not be removed
    pub delete_failures: usize,
}

/// The resolution state machine.
pub struct Resolver<'a> {
    tree: &'a mut Tree,
    fingerprinter: &'a mut Fingerprinter,
    registry: &'a mut Registry,
    delete_config: DeleteConfig,
    order: Vec<ContentHash>,
    state: State,
    stats: ResolveStats,
}

impl<'a> Resolver<'a> {
    /// Start at the first group of the descending-waste list.
    pub fn new(
        tree: &'a mut Tree,
        fingerprinter: &'a mut Fingerprinter,
        registry: &'a mut Registry,
        delete_config: DeleteConfig,
    ) -> Self {
        let order = registry
            .groups_by_descending_waste(tree)
            .into_iter()
            .map(|(hash, _)| hash)
            .collect();
        Self {
            tree,
            fingerprinter,
            registry,
            delete_config,
            order,
            state: State::Reviewing(0),
            stats: ResolveStats::default(),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    /// Groups still to be reviewed, in review order.
    #[must_use]
    pub fn pending(&self) -> &[ContentHash] {
        &self.order
    }

    /// Totals so far.
    #[must_use]
    pub fn stats(&self) -> &ResolveStats {
        &self.stats
    }

    /// Run until [`State::Done`] or [`State::Quit`].
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::InvalidChoice`] if the chooser answers with a
    /// key that was not offered, and propagates chooser and fatal
    /// reverification errors.
    pub fn run(
        &mut self,
        chooser: &mut dyn Chooser,
        observer: &mut dyn ResolutionObserver,
    ) -> Result<State, ResolveError> {
        while let State::Reviewing(_) = self.state {
            self.step(chooser, observer)?;
        }
        observer.on_finish(self.state);
        Ok(self.state)
    }

    /// Perform one transition.
    ///
    /// # Errors
    ///
    /// See [`Resolver::run`].
    pub fn step(
        &mut self,
        chooser: &mut dyn Chooser,
        observer: &mut dyn ResolutionObserver,
    ) -> Result<State, ResolveError> {
        let State::Reviewing(index) = self.state else {
            return Ok(self.state);
        };
        if self.order.is_empty() {
            self.state = State::Done;
            return Ok(self.state);
        }

        let total = self.order.len();
        let index = index % total;
        let hash = self.order[index];

        observer.on_group(
            index + 1,
            total,
            &hash,
            self.registry.members(&hash).len(),
            self.registry.duplicated_bytes(&hash, self.tree),
        );

        let events = self.registry.reverify(&hash, self.tree, self.fingerprinter)?;
        for event in &events {
            observer.on_reverify(event);
            if let ReverifyEvent::Changed { new_hash, .. } = event {
                self.enqueue(*new_hash);
            }
        }

        let members = self.registry.members(&hash).to_vec();
        if members.len() < 2 {
            self.order.remove(index);
            self.state = State::Reviewing(index);
            return Ok(self.state);
        }

        // reverification may have appended groups
        let total = self.order.len();
        let options = self.options(&members);
        let choice = chooser.choose(PROMPT, &options)?;
        self.state = match choice.as_str() {
            "n" => State::Reviewing((index + 1) % total),
            "p" => State::Reviewing((index + total - 1) % total),
            "q" => State::Quit,
            "D" => {
                self.delete_members(&members, None, observer);
                self.resolve(index, &hash, None);
                State::Reviewing(index)
            }
            other => match other.parse::<usize>() {
                Ok(k) if (1..=members.len()).contains(&k) => {
                    let keep = members[k - 1];
                    self.delete_members(&members, Some(keep), observer);
                    self.resolve(index, &hash, Some(keep));
                    State::Reviewing(index)
                }
                _ => return Err(ResolveError::InvalidChoice(other.to_string())),
            },
        };
        Ok(self.state)
    }

    fn options(&self, members: &[NodeId]) -> Vec<ChoiceOption> {
        let mut options: Vec<ChoiceOption> = members
            .iter()
            .enumerate()
            .map(|(k, &id)| {
                ChoiceOption::new(
                    (k + 1).to_string(),
                    format!("Keep only \"{}\"", self.tree.path(id).display()),
                )
            })
            .collect();
        options.push(ChoiceOption::new("D", "Delete ALL"));
        options.push(ChoiceOption::new("n", "Next duplicate"));
        options.push(ChoiceOption::new("p", "Previous duplicate"));
        options.push(ChoiceOption::new("q", "Quit"));
        options
    }

    /// A member that drifted into a group with two or more members gets
    /// that group reviewed too.
    fn enqueue(&mut self, hash: ContentHash) {
        if !self.order.contains(&hash) && self.registry.members(&hash).len() > 1 {
            self.order.push(hash);
        }
    }

    fn delete_members(
        &mut self,
        members: &[NodeId],
        keep: Option<NodeId>,
        observer: &mut dyn ResolutionObserver,
    ) {
        let kept_path = keep.map(|k| self.tree.path(k));
        for &member in members.iter().filter(|&&m| Some(m) != keep) {
            if let Some(kept_path) = &kept_path {
                let path = self.tree.path(member);
                if path.starts_with(kept_path) || kept_path.starts_with(&path) {
                    log::warn!(
                        "Not deleting {}: it overlaps the kept copy {}",
                        path.display(),
                        kept_path.display()
                    );
                    continue;
                }
            }
            let mut removed = 0usize;
            let result = delete_node(self.tree, member, &self.delete_config, &mut |r| {
                removed += 1;
                observer.on_deleted(r);
            });
            self.stats.entries_deleted += removed;
            match result {
                Ok(_) => self.stats.bytes_freed += self.tree.size(member),
                Err(e) => {
                    log::error!("Failed to delete {}: {}", e.path().display(), e);
                    observer.on_delete_failed(&e);
                    self.stats.delete_failures += 1;
                }
            }
        }
    }

    fn resolve(&mut self, index: usize, hash: &ContentHash, keep: Option<NodeId>) {
        self.registry.remove(hash);
        if let Some(kept) = keep {
            self.registry.register(kept, *hash);
        }
        self.order.remove(index);
        self.stats.groups_resolved += 1;
    }
}

impl std::fmt::Debug for Resolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("state", &self.state)
            .field("pending", &self.order.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
