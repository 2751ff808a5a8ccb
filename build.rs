use vergen_gix::{Emitter, GixBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Short git sha and commit date for `featcheck --version`.  Outside of a git checkout vergen
    // emits placeholder values, which the version output leaves out.
    let gix = GixBuilder::default().sha(true).commit_date(true).build()?;

    Emitter::default().add_instructions(&gix)?.emit()?;

    Ok(())
}
