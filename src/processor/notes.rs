use crate::models::{Attachment, Comment, RawAttachment, RawComment};
use crate::processor::html;

/// Project attachment records into canonical shape.
pub fn normalize_attachments(attachments: &[RawAttachment]) -> Vec<Attachment> {
    attachments
        .iter()
        .map(|att| Attachment {
            id: att.id.clone(),
            filename: att.filename.clone(),
            size: att.size,
            media_type: att.media_type.clone(),
        })
        .collect()
}

/// Project comment records into canonical shape.
///
/// Comment bodies arrive as markup, so each one goes through the same text
/// normalizer as page content.
pub fn normalize_comments(comments: &[RawComment]) -> Vec<Comment> {
    comments
        .iter()
        .map(|comment| Comment {
            id: comment.id.clone(),
            author: comment.author.clone(),
            created: comment.created.clone(),
            content: html::normalize(&comment.content),
        })
        .collect()
}
