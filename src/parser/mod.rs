pub mod blocks;
pub mod meal;
pub mod sections;

use meal::MealRow;

/// Three-pass pipeline: markdown → blocks → recipe sections → import rows.
pub fn parse_recipes_md(markdown: &str) -> Vec<MealRow> {
    let blocks = blocks::classify_lines(markdown);
    sections::split_recipes(&blocks)
        .iter()
        .map(meal::meal_row)
        .collect()
}
