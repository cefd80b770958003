use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Question text and options are authored by professors in a rich-text
/// builder and reach the learner unchanged, so safe tags (like <b>, <p>)
/// are kept while <script>, <iframe> and event attributes are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
