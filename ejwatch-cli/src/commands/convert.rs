//! `ejwatch convert-table <CSV> <JSON>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ejwatch_core::convert_csv_to_json;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// `ip,terminal_id` CSV with a header row.
    pub csv: PathBuf,

    /// JSON file to write.
    pub json: PathBuf,
}

impl ConvertArgs {
    pub fn run(self) -> Result<()> {
        let count = convert_csv_to_json(&self.csv, &self.json).with_context(|| {
            format!(
                "failed to convert {} to {}",
                self.csv.display(),
                self.json.display()
            )
        })?;
        println!(
            "converted {count} entries from {} to {}",
            self.csv.display(),
            self.json.display()
        );
        Ok(())
    }
}
