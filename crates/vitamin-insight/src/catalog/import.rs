use super::{Nutrient, NutrientId};
use serde::{Deserialize, Deserializer};
use std::io::Read;

const LIST_SEPARATOR: char = ';';

pub(super) fn parse_nutrients<R: Read>(reader: R) -> Result<Vec<Nutrient>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut nutrients = Vec::new();

    for record in csv_reader.deserialize::<CatalogRow>() {
        let row = record?;
        nutrients.push(Nutrient {
            id: NutrientId::new(row.nutrient),
            recommended_foods: row.recommended_foods,
            foods_to_avoid: row.foods_to_avoid,
            symptoms: row.symptoms,
        });
    }

    Ok(nutrients)
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Nutrient")]
    nutrient: String,
    #[serde(
        rename = "Recommended Foods",
        default,
        deserialize_with = "split_list"
    )]
    recommended_foods: Vec<String>,
    #[serde(rename = "Foods To Avoid", default, deserialize_with = "split_list")]
    foods_to_avoid: Vec<String>,
    #[serde(rename = "Symptoms", default)]
    symptoms: String,
}

fn split_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}
