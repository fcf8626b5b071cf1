use super::text::{escape, or_dash, short_date, truncate};
use crate::import::{ImportMode, Preview};
use crate::models::{Movie, User};

fn modal_frame(title: &str, body: &str) -> String {
    format!(
        concat!(
            r#"<div class="modal-backdrop" data-action="close-modal"></div>"#,
            r#"<div class="modal" role="dialog"><div class="modal-header"><h2>{}</h2>"#,
            r#"<button class="modal-close" data-action="close-modal">&times;</button></div>"#,
            r#"<div class="modal-body">{}</div></div>"#
        ),
        escape(title),
        body
    )
}

fn input(name: &str, label: &str, kind: &str, value: &str, required: bool) -> String {
    format!(
        r#"<label for="{name}">{label}</label><input id="{name}" name="{name}" type="{kind}" value="{value}"{req}>"#,
        name = name,
        label = escape(label),
        kind = kind,
        value = escape(value),
        req = if required { " required" } else { "" },
    )
}

fn checkbox(name: &str, label: &str, checked: bool) -> String {
    format!(
        r#"<label class="checkbox"><input name="{}" type="checkbox"{}> {}</label>"#,
        name,
        if checked { " checked" } else { "" },
        escape(label)
    )
}

/// Create form when `movie` is `None`, edit form otherwise.
pub fn movie_form(movie: Option<&Movie>) -> String {
    let title = if movie.is_some() { "Edit Movie" } else { "Add Movie" };
    let text = |f: &dyn Fn(&Movie) -> Option<String>| movie.and_then(f).unwrap_or_default();
    let fields = [
        input("title", "Title", "text", &text(&|m| Some(m.title.clone())), true),
        input("year", "Year", "number", &text(&|m| m.year.map(|y| y.to_string())), false),
        input("genres", "Genres (comma separated)", "text", &text(&|m| Some(m.genres.clone())), false),
        input("rating", "Rating", "number", &text(&|m| m.rating.map(|r| r.to_string())), false),
        input("runtime", "Runtime (minutes)", "number", &text(&|m| m.runtime.map(|r| r.to_string())), false),
        input("director", "Director", "text", &text(&|m| m.director.clone()), false),
        input("posterUrl", "Poster URL", "url", &text(&|m| m.poster_url.clone()), false),
        format!(
            r#"<label for="plot">Plot</label><textarea id="plot" name="plot">{}</textarea>"#,
            escape(&text(&|m| m.plot.clone()))
        ),
    ]
    .concat();
    let id_attr = movie
        .map(|m| format!(r#" data-id="{}""#, escape(&m.id.to_string())))
        .unwrap_or_default();
    let body = format!(
        concat!(
            r#"<form id="movie-form"{}>{}<div class="modal-actions">"#,
            r#"<button type="button" data-action="close-modal">Cancel</button>"#,
            r#"<button type="submit" class="btn-primary">Save</button></div></form>"#
        ),
        id_attr, fields
    );
    modal_frame(title, &body)
}

pub fn movie_detail(movie: &Movie) -> String {
    let poster = movie
        .poster_url
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .map(|u| format!(r#"<img class="poster" src="{}" alt="poster">"#, escape(u)))
        .unwrap_or_default();
    let body = format!(
        concat!(
            r#"<div class="detail">{poster}<dl>"#,
            "<dt>Year</dt><dd>{year}</dd><dt>Genres</dt><dd>{genres}</dd>",
            "<dt>Rating</dt><dd>{rating}</dd><dt>Runtime</dt><dd>{runtime}</dd>",
            "<dt>Director</dt><dd>{director}</dd></dl><p>{plot}</p></div>"
        ),
        poster = poster,
        year = or_dash(movie.year),
        genres = or_dash(Some(movie.genres.as_str())),
        rating = or_dash(movie.rating.map(|r| format!("{:.1}/10", r))),
        runtime = or_dash(movie.runtime.map(|m| format!("{} min", m))),
        director = or_dash(movie.director.as_deref()),
        plot = or_dash(movie.plot.as_deref().map(|p| truncate(p, 600))),
    );
    modal_frame(&movie.title, &body)
}

/// Email is displayed read-only and has no form field.
pub fn user_form(user: &User) -> String {
    let body = format!(
        concat!(
            r#"<form id="user-form" data-id="{id}">{name}"#,
            r#"<label>Email</label><p class="readonly">{email}</p>{admin}{active}"#,
            r#"<div class="modal-actions"><button type="button" data-action="close-modal">Cancel</button>"#,
            r#"<button type="submit" class="btn-primary">Save</button></div></form>"#
        ),
        id = escape(&user.id.to_string()),
        name = input("name", "Name", "text", &user.name, true),
        email = escape(&user.email),
        admin = checkbox("isAdmin", "Administrator", user.is_admin),
        active = checkbox("isActive", "Active", user.is_active),
    );
    modal_frame("Edit User", &body)
}

pub fn user_detail(user: &User) -> String {
    let body = format!(
        concat!(
            "<dl><dt>Email</dt><dd>{email}</dd><dt>Role</dt><dd>{role}</dd>",
            "<dt>Status</dt><dd>{status}</dd><dt>Joined</dt><dd>{joined}</dd></dl>"
        ),
        email = escape(&user.email),
        role = if user.is_admin { "Admin" } else { "User" },
        status = if user.is_active { "Active" } else { "Inactive" },
        joined = or_dash(user.join_date.as_deref().map(short_date)),
    );
    modal_frame(&user.name, &body)
}

pub fn upload_modal(mode: ImportMode) -> String {
    let option = |value: &str, label: &str, selected: bool| {
        format!(
            r#"<label><input type="radio" name="uploadMethod" value="{}"{}> {}</label>"#,
            value,
            if selected { " checked" } else { "" },
            label
        )
    };
    let source = match mode {
        ImportMode::Csv => r#"<input type="file" name="file" accept=".csv">"#,
        ImportMode::Json => r#"<input type="file" name="file" accept=".json">"#,
        ImportMode::Manual => {
            r#"<textarea name="manual" rows="8" placeholder='{"title": "Movie", "year": 2024}'></textarea>"#
        }
    };
    let body = format!(
        concat!(
            r#"<div class="upload-methods">{}{}{}</div><div class="upload-source">{}</div>"#,
            r#"<div id="import-preview"></div><div class="modal-actions">"#,
            r#"<button type="button" data-action="close-modal">Cancel</button></div>"#
        ),
        option("csv", "CSV file", mode == ImportMode::Csv),
        option("json", "JSON file", mode == ImportMode::Json),
        option("manual", "Manual entry", mode == ImportMode::Manual),
        source
    );
    modal_frame("Bulk Upload Movies", &body)
}

pub fn import_preview(preview: &Preview) -> String {
    let rows: String = preview
        .rows
        .iter()
        .map(|m| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                or_dash(m.title.as_deref()),
                or_dash(m.year.as_deref()),
                or_dash(m.genre.as_deref()),
                or_dash(m.rating.as_deref()),
            )
        })
        .collect();
    let more = preview.accepted.saturating_sub(preview.rows.len());
    let more_note = if more > 0 {
        format!(r#"<p class="muted">...and {} more</p>"#, more)
    } else {
        String::new()
    };
    let skipped = if preview.discarded > 0 {
        format!(r#"<p class="warning">{} invalid records skipped</p>"#, preview.discarded)
    } else {
        String::new()
    };
    // Only a non-empty batch gets an upload control.
    let submit = if preview.accepted > 0 {
        format!(
            r#"<button type="button" data-action="submit-import" class="btn-primary">Upload {} movies</button>"#,
            preview.accepted
        )
    } else {
        String::new()
    };
    format!(
        concat!(
            r#"<p><strong>{}</strong> movies ready to upload</p>{}"#,
            "<table><thead><tr><th>Title</th><th>Year</th><th>Genre</th><th>Rating</th></tr></thead>",
            "<tbody>{}</tbody></table>{}{}"
        ),
        preview.accepted, skipped, rows, more_note, submit
    )
}
