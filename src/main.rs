use anyhow::Result;

fn main() -> Result<()> {
    annbench::app::run()
}
