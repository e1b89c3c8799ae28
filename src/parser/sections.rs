use super::blocks::Block;

#[derive(Debug, Clone)]
pub struct RecipeSection {
    pub name: String,
    pub blocks: Vec<Block>,
}

impl RecipeSection {
    /// First value for `key` accepted by `parse`.
    pub fn field<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        self.blocks.iter().find_map(|b| match b {
            Block::Field { key: k, value } if k == key => parse(value),
            _ => None,
        })
    }
}

/// Split a flat Vec<Block> into one section per `Title`. Anything before
/// the first title is preamble and dropped.
pub fn split_recipes(blocks: &[Block]) -> Vec<RecipeSection> {
    let mut sections = Vec::new();
    let mut current: Option<RecipeSection> = None;

    for block in blocks {
        match block {
            Block::Title(name) => {
                sections.extend(current.take());
                current = Some(RecipeSection {
                    name: name.clone(),
                    blocks: Vec::new(),
                });
            }
            other => {
                if let Some(section) = current.as_mut() {
                    section.blocks.push(other.clone());
                }
            }
        }
    }
    sections.extend(current);

    sections
}
