use crate::error::Result;
use crate::steps::{Meta, Step, StepContext, StepState};

/// Upgrades the python packaging toolchain used by the release.
#[derive(Debug, Default)]
pub struct Install {
    state: StepState,
}

impl Install {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Step for Install {
    fn name(&self) -> &'static str {
        "Install"
    }

    fn state(&self) -> &StepState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut StepState {
        &mut self.state
    }

    fn run(&mut self, _meta: &mut Meta, ctx: &StepContext<'_>) -> Result<()> {
        ctx.system("python -m pip install --upgrade pip wheel twine")?;
        self.set_complete(true);
        Ok(())
    }
}
