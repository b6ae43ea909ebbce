fn main() -> anyhow::Result<()> {
    plexview::run()
}
