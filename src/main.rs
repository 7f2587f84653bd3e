fn main() -> anyhow::Result<()> {
    genie_presence_lib::run()
}
