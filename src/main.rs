// src/main.rs

fn main() -> anyhow::Result<()> {
    prompt_assistant_lib::run()
}
