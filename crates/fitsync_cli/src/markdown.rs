//! Markdown rendering of every document kind.
//!
//! Output is German, matching the vault layout. Rendering is pure: no wall
//! clock is consulted, so re-rendering unchanged rows yields identical
//! files.

use chrono::{Datelike, NaiveDate, Weekday};
use fitsync_model::{
    DailyData, DayMeals, Document, Ingredient, InventoryItem, MealPrepPlan, MealSlot,
    Medication, MedicationLogStatus, MedicationType, PlanStatus, Recipe, ShoppingItem,
    StorageCategory, Timestamp, UserProfile,
};
use fitsync_sync_engine::{RenderContext, Renderer, SyncResult};
use std::fmt::Write as _;

/// Renders documents as markdown with YAML frontmatter.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl Renderer for MarkdownRenderer {
    fn render(&self, document: &Document<'_>, context: &RenderContext) -> SyncResult<String> {
        let text = match document {
            Document::Profile(profile) => profile_page(profile),
            Document::Medications(medications) => medication_list(medications),
            Document::Recipe(recipe) => recipe_page(recipe),
            Document::MealprepPlan(plan) => mealprep_page(plan, context),
            Document::Inventory(items) => inventory_list(items),
            Document::ShoppingList(items) => shopping_list(items),
            Document::Daily(daily) => daily_page(daily, context),
        };
        Ok(text)
    }
}

/// A frontmatter value.
enum Field {
    Text(String),
    Number(f64),
    Flag(bool),
    List(Vec<String>),
}

fn frontmatter(fields: Vec<(&str, Option<Field>)>) -> String {
    let mut out = String::from("---\n");
    for (key, value) in fields {
        let Some(value) = value else { continue };
        match value {
            Field::Text(text) => {
                let _ = writeln!(out, "{key}: \"{}\"", text.replace('"', "\\\""));
            }
            Field::Number(n) => {
                let _ = writeln!(out, "{key}: {}", plain(n));
            }
            Field::Flag(b) => {
                let _ = writeln!(out, "{key}: {b}");
            }
            Field::List(items) if items.is_empty() => {
                let _ = writeln!(out, "{key}: []");
            }
            Field::List(items) => {
                let _ = writeln!(out, "{key}:");
                for item in items {
                    let _ = writeln!(out, "  - {item}");
                }
            }
        }
    }
    out.push_str("---");
    out
}

fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut lines = vec![
        format!("| {} |", headers.join(" | ")),
        format!("| {} |", vec!["---"; headers.len()].join(" | ")),
    ];
    lines.extend(rows.iter().map(|row| format!("| {} |", row.join(" | "))));
    lines.join("\n")
}

/// Integral values without a fraction, others as given.
fn plain(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// One decimal with a comma separator.
fn decimal(n: f64) -> String {
    format!("{n:.1}").replace('.', ",")
}

fn german_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn timestamp_date(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| german_date(dt.date_naive()))
        .unwrap_or_else(|| ts.to_string())
}

fn timestamp_time(ts: Timestamp) -> String {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "–".to_string())
}

fn weekday(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Montag",
        Weekday::Tue => "Dienstag",
        Weekday::Wed => "Mittwoch",
        Weekday::Thu => "Donnerstag",
        Weekday::Fri => "Freitag",
        Weekday::Sat => "Samstag",
        Weekday::Sun => "Sonntag",
    }
}

fn recipe_page(recipe: &Recipe) -> String {
    let mut sections = vec![frontmatter(vec![
        ("id", Some(Field::Text(recipe.id.clone()))),
        ("calories", Some(Field::Number(recipe.calories))),
        ("protein", Some(Field::Number(recipe.protein))),
        ("carbs", Some(Field::Number(recipe.carbs))),
        ("fat", Some(Field::Number(recipe.fat))),
        ("tags", Some(Field::List(recipe.tags.clone()))),
        ("created", Some(Field::Text(timestamp_date(recipe.created_at)))),
        ("favorite", Some(Field::Flag(recipe.is_favorite))),
    ])];

    let title = match recipe.title.trim() {
        "" => "Unbekanntes Rezept",
        title => title,
    };
    sections.push(format!("# {title}"));
    if !recipe.description.is_empty() {
        sections.push(format!("> {}", recipe.description));
    }

    let mut meta = Vec::new();
    if let Some(minutes) = recipe.preparation_time {
        meta.push(format!("⏱️ {minutes} Min"));
    }
    if recipe.is_favorite {
        meta.push("⭐ Favorit".to_string());
    }
    if !meta.is_empty() {
        sections.push(meta.join(" | "));
    }

    sections.push("## Nährwerte".into());
    sections.push(table(
        &["Kalorien", "Protein", "Kohlenhydrate", "Fett"],
        &[vec![
            format!("{} kcal", plain(recipe.calories)),
            format!("{} g", decimal(recipe.protein)),
            format!("{} g", decimal(recipe.carbs)),
            format!("{} g", decimal(recipe.fat)),
        ]],
    ));

    sections.push("## Zutaten".into());
    let ingredients: Vec<String> = recipe
        .ingredients
        .iter()
        .map(|ingredient| match ingredient {
            Ingredient::Plain(line) => format!("- {line}"),
            Ingredient::Structured { item, amount } => format!("- {amount} {item}"),
        })
        .collect();
    if !ingredients.is_empty() {
        sections.push(ingredients.join("\n"));
    }

    sections.push("## Zubereitung".into());
    let steps: Vec<String> = recipe
        .instructions
        .iter()
        .enumerate()
        .map(|(i, step)| format!("{}. {step}", i + 1))
        .collect();
    if !steps.is_empty() {
        sections.push(steps.join("\n"));
    }

    if !recipe.tags.is_empty() {
        let tags: Vec<String> = recipe.tags.iter().map(|t| format!("#{t}")).collect();
        sections.push(format!("---\nTags: {}", tags.join(" ")));
    }
    sections.join("\n\n")
}

fn slot_row(label: &str, slot: &MealSlot, context: &RenderContext) -> Vec<String> {
    let mut info = Vec::new();
    if slot.is_leftover {
        info.push("♻️ Reste");
    }
    if slot.is_cooked {
        info.push("✅ Gekocht");
    }
    vec![
        label.to_string(),
        context
            .recipe_title(&slot.recipe_id)
            .unwrap_or(&slot.recipe_id)
            .to_string(),
        plain(slot.portions),
        if info.is_empty() { "–".to_string() } else { info.join(" ") },
    ]
}

fn day_rows(meals: &DayMeals, context: &RenderContext) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    if let Some(slot) = &meals.breakfast {
        rows.push(slot_row("Frühstück", slot, context));
    }
    if let Some(slot) = &meals.lunch {
        rows.push(slot_row("Mittagessen", slot, context));
    }
    if let Some(slot) = &meals.dinner {
        rows.push(slot_row("Abendessen", slot, context));
    }
    for slot in &meals.snacks {
        rows.push(slot_row("Snack", slot, context));
    }
    rows
}

fn mealprep_page(plan: &MealPrepPlan, context: &RenderContext) -> String {
    let status = match plan.status {
        PlanStatus::Planning => "planning",
        PlanStatus::Active => "active",
        PlanStatus::Completed => "completed",
        PlanStatus::Cancelled => "cancelled",
    };
    let mut sections = vec![frontmatter(vec![
        ("id", Some(Field::Text(plan.id.clone()))),
        ("status", Some(Field::Text(status.to_string()))),
        ("start", Some(Field::Text(plan.start_date.to_string()))),
        ("end", Some(Field::Text(plan.end_date.to_string()))),
    ])];

    let title = plan.name.clone().unwrap_or_else(|| {
        format!(
            "Mealprep {} – {}",
            german_date(plan.start_date),
            german_date(plan.end_date)
        )
    });
    sections.push(format!("# {title}"));
    let badge = match plan.status {
        PlanStatus::Planning => "📝 Planung",
        PlanStatus::Active => "🟢 Aktiv",
        PlanStatus::Completed => "✅ Abgeschlossen",
        PlanStatus::Cancelled => "❌ Abgebrochen",
    };
    sections.push(format!("**Status:** {badge}"));

    if !plan.days.is_empty() {
        sections.push("## Tagesplan".into());
    }
    for day in &plan.days {
        sections.push(format!("### {}, {}", weekday(day.date), german_date(day.date)));
        if day.is_rest_day {
            sections.push("*Ruhetag – keine Mahlzeiten geplant*".into());
            continue;
        }
        let rows = day_rows(&day.meals, context);
        if !rows.is_empty() {
            sections.push(table(&["Mahlzeit", "Rezept", "Portionen", "Info"], &rows));
        }
        if let Some(prep) = &day.prep_instructions {
            sections.push(format!("> **Vorbereitung:** {prep}"));
        }
    }
    sections.join("\n\n")
}

fn medication_list(medications: &[Medication]) -> String {
    let active = medications.iter().filter(|m| m.is_active).count();
    let mut sections = vec![
        frontmatter(vec![
            ("total", Some(Field::Number(medications.len() as f64))),
            ("active", Some(Field::Number(active as f64))),
        ]),
        "# Medikamente & Supplements".to_string(),
    ];
    if medications.is_empty() {
        sections.push("*Keine Medikamente eingetragen.*".into());
        return sections.join("\n\n");
    }

    let groups = [
        (MedicationType::Medication, "💊", "Medikamente"),
        (MedicationType::Vitamin, "🟡", "Vitamine"),
        (MedicationType::Supplement, "🟢", "Supplemente"),
    ];
    for (kind, emoji, label) in groups {
        let group: Vec<&Medication> = medications.iter().filter(|m| m.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        sections.push(format!("## {emoji} {label} ({})", group.len()));
        let rows: Vec<Vec<String>> = group
            .iter()
            .map(|m| {
                let dosage = match (&m.dosage, &m.dosage_unit) {
                    (Some(dosage), Some(unit)) => format!("{dosage} {unit}"),
                    (Some(dosage), None) => dosage.clone(),
                    _ => "–".to_string(),
                };
                let times = if m.schedule_times.is_empty() {
                    "–".to_string()
                } else {
                    m.schedule_times.join(", ")
                };
                let status = if m.is_active { "✅ Aktiv" } else { "⏸️ Pausiert" };
                vec![m.name.clone(), dosage, times, status.to_string()]
            })
            .collect();
        sections.push(table(&["Name", "Dosierung", "Zeiten", "Status"], &rows));

        let notes: Vec<String> = group
            .iter()
            .filter_map(|m| m.notes.as_ref().map(|n| format!("- **{}:** {n}", m.name)))
            .collect();
        if !notes.is_empty() {
            sections.push("### Notizen".into());
            sections.push(notes.join("\n"));
        }
    }
    sections.join("\n\n")
}

fn inventory_list(items: &[InventoryItem]) -> String {
    let mut sections = vec![
        frontmatter(vec![("total_items", Some(Field::Number(items.len() as f64)))]),
        "# Inventar".to_string(),
    ];
    if items.is_empty() {
        sections.push("*Keine Vorräte eingetragen.*".into());
        return sections.join("\n\n");
    }

    let groups = [
        (StorageCategory::Fridge, "🧊", "Kühlschrank"),
        (StorageCategory::Freezer, "❄️", "Gefrierschrank"),
        (StorageCategory::Pantry, "🗄️", "Vorratsschrank"),
    ];
    for (category, emoji, label) in groups {
        let rows: Vec<Vec<String>> = items
            .iter()
            .filter(|item| item.category == category)
            .map(|item| {
                let expiry = item.expiry_date.map_or_else(|| "–".to_string(), german_date);
                let status = if item.needs_restock() { "🛒 Nachkaufen" } else { "✅" };
                vec![
                    item.name.clone(),
                    format!("{} {}", plain(item.quantity), item.unit),
                    expiry,
                    status.to_string(),
                ]
            })
            .collect();
        if rows.is_empty() {
            continue;
        }
        sections.push(format!("## {emoji} {label} ({})", rows.len()));
        sections.push(table(&["Artikel", "Menge", "MHD", "Status"], &rows));
    }
    sections.join("\n\n")
}

const SHOPPING_CATEGORIES: [(&str, &str); 11] = [
    ("produce", "Obst & Gemüse"),
    ("grains", "Getreide & Nudeln"),
    ("protein", "Proteinquellen"),
    ("dairy", "Milchprodukte"),
    ("bakery", "Backwaren"),
    ("cheese", "Käse"),
    ("meat", "Fleisch & Fisch"),
    ("spices", "Gewürze"),
    ("frozen", "Tiefkühl"),
    ("household", "Haushalt"),
    ("other", "Sonstiges"),
];

fn progress_bar(checked: usize, total: usize) -> String {
    const WIDTH: usize = 20;
    let ratio = checked as f64 / total as f64;
    let filled = (ratio * WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {}% ({checked}/{total})",
        "█".repeat(filled),
        "░".repeat(WIDTH - filled),
        (ratio * 100.0).round()
    )
}

fn shopping_list(items: &[ShoppingItem]) -> String {
    let checked = items.iter().filter(|i| i.checked).count();
    let mut sections = vec![
        frontmatter(vec![
            ("total_items", Some(Field::Number(items.len() as f64))),
            ("checked", Some(Field::Number(checked as f64))),
        ]),
        "# Einkaufsliste".to_string(),
    ];
    if items.is_empty() {
        sections.push("*Die Einkaufsliste ist leer.*".into());
        return sections.join("\n\n");
    }
    sections.push(format!("**Fortschritt:** {}", progress_bar(checked, items.len())));

    let known = |category: &str| SHOPPING_CATEGORIES.iter().any(|(key, _)| *key == category);
    for (key, label) in SHOPPING_CATEGORIES {
        let lines: Vec<String> = items
            .iter()
            .filter(|item| item.category == key || (key == "other" && !known(&item.category)))
            .map(|item| {
                let checkbox = if item.checked { "- [x]" } else { "- [ ]" };
                let quantity = if item.quantity > 0.0 && !item.unit.is_empty() {
                    format!("{} {} ", plain(item.quantity), item.unit)
                } else {
                    String::new()
                };
                format!("{checkbox} {quantity}{}", item.ingredient)
            })
            .collect();
        if lines.is_empty() {
            continue;
        }
        sections.push(format!("## {label}"));
        sections.push(lines.join("\n"));
    }
    sections.join("\n\n")
}

fn profile_page(profile: &UserProfile) -> String {
    let name = profile
        .display_name
        .as_deref()
        .or(profile.first_name.as_deref())
        .unwrap_or("Profil");
    let mut sections = vec![
        frontmatter(vec![
            ("uid", Some(Field::Text(profile.uid.clone()))),
            ("goal", profile.goal.clone().map(Field::Text)),
            ("current_weight", profile.current_weight.map(Field::Number)),
            ("target_weight", profile.target_weight.map(Field::Number)),
        ]),
        format!("# {name}"),
    ];

    let mut body = Vec::new();
    if let Some(height) = profile.height {
        body.push(vec!["Größe".to_string(), format!("{} cm", plain(height))]);
    }
    if let Some(weight) = profile.current_weight {
        body.push(vec!["Gewicht".to_string(), format!("{} kg", decimal(weight))]);
    }
    if let Some(target) = profile.target_weight {
        body.push(vec!["Zielgewicht".to_string(), format!("{} kg", decimal(target))]);
    }
    if !body.is_empty() {
        sections.push("## Körperdaten".into());
        sections.push(table(&["", "Wert"], &body));
    }

    if let Some(strategy) = &profile.strategy {
        sections.push("## Ernährungsziele".into());
        sections.push(table(
            &["Kalorien", "Protein", "Kohlenhydrate", "Fett"],
            &[vec![
                format!("{} kcal", plain(strategy.daily_calories)),
                format!("{} g", decimal(strategy.protein_target)),
                format!("{} g", decimal(strategy.carb_target)),
                format!("{} g", decimal(strategy.fat_target)),
            ]],
        ));
    }
    if let Some(water) = &profile.water_settings {
        sections.push(format!("**Wasserziel:** {} ml", plain(water.daily_goal)));
    }
    sections.join("\n\n")
}

/// Classifies a reading into the usual blood pressure grades.
fn blood_pressure_grade(systolic: u16, diastolic: u16) -> &'static str {
    match (systolic, diastolic) {
        (s, d) if s < 120 && d < 80 => "🟢 Optimal",
        (s, d) if s < 130 && d < 85 => "🟡 Normal",
        (s, d) if s < 140 && d < 90 => "🟠 Hoch normal",
        (s, d) if s < 160 && d < 100 => "🔴 Grad 1",
        (s, d) if s < 180 && d < 110 => "🔴 Grad 2",
        _ => "🔴 Grad 3",
    }
}

fn intake_emoji(status: MedicationLogStatus) -> &'static str {
    match status {
        MedicationLogStatus::Taken => "✅",
        MedicationLogStatus::Missed => "❌",
        MedicationLogStatus::Skipped => "⏭️",
        MedicationLogStatus::Pending => "⏳",
    }
}

fn intake_label(status: MedicationLogStatus) -> &'static str {
    match status {
        MedicationLogStatus::Taken => "taken",
        MedicationLogStatus::Missed => "missed",
        MedicationLogStatus::Skipped => "skipped",
        MedicationLogStatus::Pending => "pending",
    }
}

/// Water totals may arrive in litres while the goal is in millilitres.
fn water_ml(total: f64, amount: f64, goal_ml: f64) -> f64 {
    if total > 0.0 && total < goal_ml / 100.0 {
        (amount * 1000.0).round()
    } else {
        amount.round()
    }
}

fn water_display(ml: f64) -> String {
    if ml >= 1000.0 {
        format!("{:.1} L", ml / 1000.0)
    } else {
        format!("{} ml", plain(ml))
    }
}

fn daily_page(daily: &DailyData, context: &RenderContext) -> String {
    let day = weekday(daily.date);
    let mut sections = vec![
        frontmatter(vec![
            ("date", Some(Field::Text(daily.date.to_string()))),
            ("weekday", Some(Field::Text(day.to_string()))),
            ("meals", Some(Field::Number(daily.meals.len() as f64))),
            ("water_entries", Some(Field::Number(daily.water_logs.len() as f64))),
        ]),
        format!("# {day}, {}", german_date(daily.date)),
    ];

    if !daily.weight_logs.is_empty() {
        sections.push("## Gewicht".into());
        for log in &daily.weight_logs {
            sections.push(format!("**{} kg**", decimal(log.weight)));
        }
    }

    if !daily.meals.is_empty() {
        sections.push("## Mahlzeiten".into());
        let mut rows: Vec<Vec<String>> = daily
            .meals
            .iter()
            .map(|meal| {
                vec![
                    meal.description.clone(),
                    plain(meal.calories),
                    decimal(meal.protein),
                    decimal(meal.carbs),
                    decimal(meal.fat),
                ]
            })
            .collect();
        let protein: f64 = daily.meals.iter().map(|m| m.protein).sum();
        let carbs: f64 = daily.meals.iter().map(|m| m.carbs).sum();
        let fat: f64 = daily.meals.iter().map(|m| m.fat).sum();
        let calories = daily.total_calories();
        rows.push(vec![
            "**Gesamt**".to_string(),
            format!("**{}**", plain(calories)),
            format!("**{}**", decimal(protein)),
            format!("**{}**", decimal(carbs)),
            format!("**{}**", decimal(fat)),
        ]);
        sections.push(table(&["Mahlzeit", "kcal", "Protein (g)", "KH (g)", "Fett (g)"], &rows));

        if let Some(strategy) = context.profile.as_ref().and_then(|p| p.strategy.as_ref()) {
            let diff = |actual: f64, goal: f64| {
                let d = actual - goal;
                format!("{}{}", if d >= 0.0 { "+" } else { "" }, decimal(d))
            };
            sections.push("### Zielvergleich".into());
            sections.push(table(
                &["Nährstoff", "Ist", "Ziel", "Differenz"],
                &[
                    vec![
                        "Kalorien".into(),
                        format!("{} kcal", plain(calories)),
                        format!("{} kcal", plain(strategy.daily_calories)),
                        format!("{} kcal", diff(calories, strategy.daily_calories)),
                    ],
                    vec![
                        "Protein".into(),
                        format!("{} g", decimal(protein)),
                        format!("{} g", decimal(strategy.protein_target)),
                        format!("{} g", diff(protein, strategy.protein_target)),
                    ],
                    vec![
                        "Kohlenhydrate".into(),
                        format!("{} g", decimal(carbs)),
                        format!("{} g", decimal(strategy.carb_target)),
                        format!("{} g", diff(carbs, strategy.carb_target)),
                    ],
                    vec![
                        "Fett".into(),
                        format!("{} g", decimal(fat)),
                        format!("{} g", decimal(strategy.fat_target)),
                        format!("{} g", diff(fat, strategy.fat_target)),
                    ],
                ],
            ));
        }
    }

    if !daily.water_logs.is_empty() {
        sections.push("## Wasser".into());
        let goal = context
            .profile
            .as_ref()
            .and_then(|p| p.water_settings.as_ref())
            .map_or(2500.0, |w| w.daily_goal);
        let raw = daily.total_water();
        let total = water_ml(raw, raw, goal);
        let percent = if goal > 0.0 { (total / goal * 100.0).round() } else { 0.0 };
        sections.push(format!(
            "**{}** / {} ({}%)",
            water_display(total),
            water_display(goal),
            plain(percent)
        ));
        if daily.water_logs.len() > 1 {
            let rows: Vec<Vec<String>> = daily
                .water_logs
                .iter()
                .map(|log| {
                    vec![
                        timestamp_time(log.timestamp),
                        format!("{} ml", plain(water_ml(raw, log.amount, goal))),
                    ]
                })
                .collect();
            sections.push(table(&["Uhrzeit", "Menge"], &rows));
        }
    }

    if !daily.medication_logs.is_empty() {
        sections.push("## 💊 Medikamente".into());
        let rows: Vec<Vec<String>> = daily
            .medication_logs
            .iter()
            .map(|log| {
                vec![
                    intake_emoji(log.status).to_string(),
                    context
                        .medication_name(&log.medication_id)
                        .unwrap_or(&log.medication_id)
                        .to_string(),
                    log.actual_time.clone().unwrap_or_else(|| log.scheduled_time.clone()),
                    intake_label(log.status).to_string(),
                ]
            })
            .collect();
        sections.push(table(&["", "Medikament", "Uhrzeit", "Status"], &rows));
    }

    if !daily.blood_pressure_logs.is_empty() {
        sections.push("## Blutdruck".into());
        let mut rows = Vec::new();
        for log in &daily.blood_pressure_logs {
            let period = match log.period.as_deref() {
                Some("morning") => "🌅",
                Some("evening") => "🌙",
                Some(_) => "🕐",
                None => "",
            };
            // Local wall-clock time as written in the measurement.
            let time = log
                .measured_at
                .split_once('T')
                .map_or("", |(_, rest)| rest.get(..5).unwrap_or(rest));
            rows.push(vec![
                format!("{period} {time}").trim().to_string(),
                format!("{}/{}", log.systolic, log.diastolic),
                blood_pressure_grade(log.systolic, log.diastolic).to_string(),
                log.pulse.map_or_else(|| "–".to_string(), |p| format!("{p} bpm")),
            ]);
            if let Some(notes) = &log.notes {
                rows.push(vec![String::new(), format!("*{notes}*"), String::new(), String::new()]);
            }
        }
        sections.push(table(&["Uhrzeit", "Wert", "Bewertung", "Puls"], &rows));
    }

    if daily.is_empty() {
        sections.push("*Keine Daten für diesen Tag.*".into());
    }

    let previous = daily.date.pred_opt().map(|d| d.to_string()).unwrap_or_default();
    let next = daily.date.succ_opt().map(|d| d.to_string()).unwrap_or_default();
    sections.push(format!("---\n[[{previous}|← {previous}]] | [[{next}|{next} →]]"));
    sections.join("\n\n")
}
