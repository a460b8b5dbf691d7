use super::Render;
use crate::error::AppError;
use crate::session::SessionContext;

/// Answer `question` in the active session and hand back the whole history.
pub async fn ask_question(ctx: &mut SessionContext, question: &str) -> Result<Render, AppError> {
    ctx.ask(question).await?;
    Ok(Render::from_context(ctx))
}
