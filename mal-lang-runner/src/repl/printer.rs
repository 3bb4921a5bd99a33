use mal_lang_interpreter::Error;
use tracing::debug;

pub fn print(output: Result<Option<String>, Error>) {
    match output {
        Ok(Some(text)) => println!("{text}"),
        Ok(None) => {}
        Err(err) => {
            debug!(kind = ?err.kind(), "evaluation failed");
            println!("Error: {err}")
        }
    }
}
