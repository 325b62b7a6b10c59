fn main() -> anyhow::Result<()> {
    vitalwatch_lib::run()
}
