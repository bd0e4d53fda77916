fn main() -> Result<(), Box<dyn std::error::Error>> {
    vergen_gix::Emitter::default()
        .add_instructions(&vergen_gix::BuildBuilder::all_build()?)?
        .add_instructions(&vergen_gix::CargoBuilder::all_cargo()?)?
        .add_instructions(&vergen_gix::RustcBuilder::all_rustc()?)?
        .add_instructions(&vergen_gix::GixBuilder::all_git()?)?
        .emit_and_set()?;
    Ok(())
}
