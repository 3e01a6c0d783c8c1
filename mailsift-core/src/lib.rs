pub mod batch;
pub mod config;
pub mod error;
pub mod report;

pub use batch::{BatchResult, BatchScheduler, Clock, ManualClock, SystemClock};
pub use config::{HarvestConfig, ServerConfig, Settings};
pub use error::HarvestError;
pub use report::{BatchResponse, BatchSummary, ReportFormat};

use colored::Colorize;

pub fn print_banner() {
    let banner = r#"
                 _ _     _  __ _
  _ __ ___   __ _(_) |___(_)/ _| |_
 | '_ ` _ \ / _` | | / __| | |_| __|
 | | | | | | (_| | | \__ \ |  _| |_
 |_| |_| |_|\__,_|_|_|___/_|_|  \__|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} v{}\n",
        "contact address harvester".bright_white(),
        env!("CARGO_PKG_VERSION")
    );
}
