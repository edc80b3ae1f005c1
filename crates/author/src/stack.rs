use crate::command::{Command, CommandError};
use crate::context::EditorContext;

/// Linear undo/redo history.
///
/// Commands left of the cursor are applied; commands at or right of it are
/// available to redo. Executing a new command discards the redo tail.
#[derive(Debug, Default)]
pub struct CommandStack {
    commands: Vec<Box<dyn Command>>,
    cursor: usize,
    limit: Option<usize>,
}

impl CommandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` applied commands; older ones are forgotten.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::default()
        }
    }

    /// Apply a command and record it. A failing command is not recorded and
    /// leaves the history untouched.
    pub fn execute<C: Command + 'static>(
        &mut self,
        ctx: &mut EditorContext,
        command: C,
    ) -> Result<(), CommandError> {
        self.execute_boxed(ctx, Box::new(command))
    }

    pub fn execute_boxed(
        &mut self,
        ctx: &mut EditorContext,
        mut command: Box<dyn Command>,
    ) -> Result<(), CommandError> {
        if let Err(err) = command.apply(ctx) {
            tracing::warn!(command = command.label(), %err, "command failed");
            return Err(err);
        }
        tracing::debug!(command = command.label(), "executed");
        self.commands.truncate(self.cursor);
        self.commands.push(command);
        self.cursor = self.commands.len();

        if let Some(limit) = self.limit {
            if self.commands.len() > limit {
                let excess = self.commands.len() - limit;
                self.commands.drain(..excess);
                self.cursor -= excess;
            }
        }
        Ok(())
    }

    /// Undo the last applied command. Returns `Ok(false)` when there is
    /// nothing to undo. If the command cannot be undone the cursor stays put.
    pub fn undo(&mut self, ctx: &mut EditorContext) -> Result<bool, CommandError> {
        if self.cursor == 0 {
            tracing::debug!("nothing to undo");
            return Ok(false);
        }
        let command = &mut self.commands[self.cursor - 1];
        if let Err(err) = command.undo(ctx) {
            tracing::warn!(command = command.label(), %err, "undo failed");
            return Err(err);
        }
        tracing::debug!(command = command.label(), "undone");
        self.cursor -= 1;
        Ok(true)
    }

    /// Re-apply the next undone command. Returns `Ok(false)` when there is
    /// nothing to redo.
    pub fn redo(&mut self, ctx: &mut EditorContext) -> Result<bool, CommandError> {
        if self.cursor == self.commands.len() {
            tracing::debug!("nothing to redo");
            return Ok(false);
        }
        let command = &mut self.commands[self.cursor];
        if let Err(err) = command.apply(ctx) {
            tracing::warn!(command = command.label(), %err, "redo failed");
            return Err(err);
        }
        tracing::debug!(command = command.label(), "redone");
        self.cursor += 1;
        Ok(true)
    }

    /// Total recorded commands, applied and redoable.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    pub fn undo_label(&self) -> Option<&'static str> {
        self.cursor
            .checked_sub(1)
            .map(|i| self.commands[i].label())
    }

    pub fn redo_label(&self) -> Option<&'static str> {
        self.commands.get(self.cursor).map(|c| c.label())
    }

    /// Forget all history without touching the scene.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = 0;
    }
}
