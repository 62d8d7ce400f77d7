use anyhow::Result;

fn main() -> Result<()> {
    lineage_cli::main_entry()
}
