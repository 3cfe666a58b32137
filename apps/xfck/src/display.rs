//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io;
use xfck_ops::{LedgerStatus, PipelineReport};

/// Output renderer for command results
#[derive(Clone, Copy)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    pub fn render_run(&self, report: &PipelineReport) -> io::Result<()> {
        if self.json_output {
            return print_json(report);
        }

        if let Some(walk) = &report.enumeration {
            println!(
                "Enumerated {} files in {} directories ({} skipped) in {} ms",
                walk.files, walk.directories, walk.skipped, walk.duration_ms
            );
        } else {
            println!("Ledger already populated; enumeration skipped");
        }

        if !report.phases.is_empty() {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec![
                Cell::new("Side").add_attribute(Attribute::Bold),
                Cell::new("Queued").add_attribute(Attribute::Bold),
                Cell::new("Hashed").add_attribute(Attribute::Bold),
                Cell::new("Failed").add_attribute(Attribute::Bold),
                Cell::new("Unchanged").add_attribute(Attribute::Bold),
                Cell::new("Time (ms)").add_attribute(Attribute::Bold),
            ]);

            for phase in &report.phases {
                let failed = if phase.failed > 0 {
                    Cell::new(phase.failed).fg(Color::Red)
                } else {
                    Cell::new(phase.failed)
                };
                table.add_row(vec![
                    Cell::new(phase.side.describe()),
                    Cell::new(phase.queued),
                    Cell::new(phase.hashed),
                    failed,
                    Cell::new(phase.unchanged),
                    Cell::new(phase.duration_ms),
                ]);
            }
            println!("{table}");
        }

        self.render_status(&report.status)
    }

    pub fn render_status(&self, status: &LedgerStatus) -> io::Result<()> {
        if self.json_output {
            return print_json(status);
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Files").add_attribute(Attribute::Bold),
            Cell::new("Pending new").add_attribute(Attribute::Bold),
            Cell::new("Pending old").add_attribute(Attribute::Bold),
            Cell::new("Hashed both").add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new(status.total),
            Cell::new(status.pending_new),
            Cell::new(status.pending_old),
            Cell::new(status.hashed_both),
        ]);
        println!("{table}");

        if status.is_complete() {
            println!("[OK] Every file has both hashes recorded.");
        } else {
            println!("[PENDING] Rerun `xfck run` to continue.");
        }
        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    println!("{json}");
    Ok(())
}
