//! Terminal implementation of the interactive fallback.

use console::style;
use dialoguer::{theme::ColorfulTheme, Editor, FuzzySelect};
use prem::{
  errors::{PremError, Result},
  interaction::Interaction,
};

/// Opens `$EDITOR` for the search query and a fuzzy picker for the matches.
pub struct Terminal;

impl Interaction for Terminal {
  fn edit(&self, seed: &str) -> Result<Option<String>> {
    println!(
      "{} No identifier found. Edit the text below into a search query, or empty it to skip.",
      style("✎").cyan()
    );
    Editor::new()
      .extension(".txt")
      .edit(seed)
      .map_err(|e| PremError::Io(std::io::Error::other(e)))
  }

  fn select(&self, labels: &[String]) -> Result<Option<usize>> {
    FuzzySelect::with_theme(&ColorfulTheme::default())
      .with_prompt("Which article is this? (Esc to skip)")
      .items(labels)
      .default(0)
      .interact_opt()
      .map_err(|e| PremError::Io(std::io::Error::other(e)))
  }
}
