/// Clean teacher feedback using the ammonia library.
///
/// Feedback is rendered as rich text next to the student's answer, so safe
/// tags (like <b>, <p>) survive while <script>, <iframe> and event-handler
/// attributes are stripped. Whitespace-only results collapse to `None`.
pub fn clean_feedback(input: Option<&str>) -> Option<String> {
    input
        .map(ammonia::clean)
        .filter(|cleaned| !cleaned.trim().is_empty())
}
