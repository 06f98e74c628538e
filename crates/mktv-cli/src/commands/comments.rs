use crate::app::App;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use mktv_core::{CommentStore, LibraryError};
use owo_colors::OwoColorize;

pub async fn list(app: &App, title_id: &str, output: &Output) -> Result<()> {
    let comments = CommentStore::new(app.store()).list_for_title(title_id).await?;
    output.emit(&comments, || {
        if comments.is_empty() {
            println!("{}", "No comments yet".bright_black());
            return;
        }
        for comment in &comments {
            println!(
                "{} {} {}",
                comment.viewer_name.bold(),
                comment.created_at.format("%Y-%m-%d %H:%M").to_string().bright_black(),
                format!("[{}]", comment.id).bright_black()
            );
            println!("  {}", comment.content);
        }
    });
    Ok(())
}

pub async fn post(app: &App, title_id: &str, text: &str, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    let comment = CommentStore::new(app.store())
        .post(&viewer, title_id, text)
        .await
        .map_err(|e| match e {
            LibraryError::InvalidComment(reason) => eyre!("Comment not posted: {}", reason),
            other => eyre!(other),
        })?;
    output.emit(&comment, || output.success(format!("Comment posted ({})", comment.id)));
    Ok(())
}

pub async fn delete(app: &App, title_id: &str, comment_id: &str, output: &Output) -> Result<()> {
    let viewer = app.viewer()?;
    CommentStore::new(app.store())
        .delete(&viewer.id, title_id, comment_id)
        .await
        .map_err(|e| match e {
            LibraryError::NotFound(_) => eyre!("No comment {} on {}", comment_id, title_id),
            LibraryError::Forbidden { .. } => eyre!("You can only delete your own comments"),
            other => eyre!(other),
        })?;
    output.success("Comment deleted");
    Ok(())
}
