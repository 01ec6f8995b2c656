use drowse_sys::SystemCounters;

use crate::OutputFormat;

pub fn run(format: OutputFormat) -> anyhow::Result<()> {
    let ids = SystemCounters::supported();
    match format {
        OutputFormat::Text => {
            for id in &ids {
                println!("{:<14} {:<26} {}", id.category, id.counter, id.instance);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ids)?),
    }
    Ok(())
}
