//! Interactive prompts using dialoguer

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Prompt user to confirm starting the search
pub fn confirm_training(candidates: usize, cv_folds: usize) -> Result<bool> {
    let message = format!(
        "Cross-validate {} candidate(s) over {} folds ({} fits)?",
        candidates,
        cv_folds,
        candidates * cv_folds
    );
    confirm_step(&message)
}
