/// Word-of-the-day record assembled from the dictionary feed and the
/// per-word lookup document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordOfTheDay {
    pub word: String,
    pub pronounce: String,
    pub part_of_speech: String,
    pub definitions: Vec<String>,
}
