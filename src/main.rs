fn main() -> anyhow::Result<()> {
    review_gate::cli::run_cli()
}
