use anyhow::{anyhow, Result};
use mal_lang_interpreter::{eval_str, root_environment};
use tracing::debug;

/// Evaluates every form of `source` in a fresh root scope. The first error
/// aborts the run.
pub fn execute(source: &str) -> Result<()> {
    // Interpreter errors hold `Rc` values, so they cross into anyhow as text.
    let mut environment = root_environment().map_err(|err| anyhow!("{err}"))?;
    let value = eval_str(source, &mut environment).map_err(|err| anyhow!("{err}"))?;
    debug!(result = %value, "finished");
    Ok(())
}
