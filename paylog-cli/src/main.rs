use anyhow::Result;

fn main() -> Result<()> {
    paylog_cli::app::run()
}
