use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Folds text into the form stored in `search_string` columns: accents stripped, lowercase, single
/// spaces.
pub fn normalize(text: &str) -> String {
	let folded: String = text.nfkd().filter(|ch| !is_combining_mark(*ch)).collect();
	let mut out = String::with_capacity(folded.len());

	for word in folded.split_whitespace() {
		if !out.is_empty() {
			out.push(' ');
		}

		out.extend(word.chars().flat_map(char::to_lowercase));
	}

	out
}

/// Returns the trimmed value, or `None` when it is blank.
pub fn non_blank<S>(value: Option<&S>) -> Option<&str>
where
	S: AsRef<str> + ?Sized,
{
	value.map(|value| value.as_ref().trim()).filter(|value| !value.is_empty())
}

pub(crate) fn push_unique(out: &mut Vec<String>, value: String) {
	if !out.iter().any(|existing| existing == &value) {
		out.push(value);
	}
}
