use super::{Nutrient, NutrientId};

type Row = (&'static str, &'static [&'static str], &'static [&'static str], &'static str);

const STANDARD_ROWS: [Row; 7] = [
    (
        "Vitamin A",
        &["Carrots", "Spinach", "Pumpkin", "Egg Yolks", "Sweet Potatoes"],
        &["Alcohol", "Processed Foods"],
        "Dry skin, poor night vision, pale eyes",
    ),
    (
        "Vitamin B12",
        &["Milk", "Eggs", "Fish", "Chicken", "B12 Tablets"],
        &["Overcooked Food", "Sugary Drinks"],
        "Fatigue, pale lips, dizziness",
    ),
    (
        "Vitamin C",
        &["Oranges", "Lemon", "Guava", "Broccoli", "Strawberries"],
        &["Junk Food", "Deep-Fried Items"],
        "Weak immunity, bleeding gums, dry skin",
    ),
    (
        "Vitamin D",
        &["Sunlight", "Mushrooms", "Fortified Milk", "Egg Yolks"],
        &["Too Much Caffeine", "Carbonated Drinks"],
        "Bone pain, low mood, fatigue",
    ),
    (
        "Vitamin E",
        &["Almonds", "Sunflower Seeds", "Spinach", "Avocado"],
        &["High-Sugar Foods"],
        "Weak muscles, vision issues",
    ),
    (
        "Iron",
        &["Spinach", "Beetroot", "Red Meat", "Dates"],
        &["Tea Immediately After Meals", "Coffee After Meals"],
        "Low energy, pale face, weakness",
    ),
    (
        "Calcium",
        &["Milk", "Curd", "Paneer", "Almonds", "Ragi"],
        &["Soft Drinks", "High Salt Intake"],
        "Weak nails, muscle cramps, brittle bones",
    ),
];

pub(super) fn nutrients() -> Vec<Nutrient> {
    STANDARD_ROWS
        .iter()
        .map(|(name, foods, avoid, symptoms)| Nutrient {
            id: NutrientId::from(*name),
            recommended_foods: foods.iter().map(|s| s.to_string()).collect(),
            foods_to_avoid: avoid.iter().map(|s| s.to_string()).collect(),
            symptoms: symptoms.to_string(),
        })
        .collect()
}
