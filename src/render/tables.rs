use super::text::{escape, or_dash, short_date};
use crate::models::{EntityId, Movie, User};

pub fn table_body(rows: &[String], columns: usize, empty_label: &str) -> String {
    if rows.is_empty() {
        return format!(
            r#"<tr class="empty-row"><td colspan="{}" class="text-center">{}</td></tr>"#,
            columns,
            escape(empty_label)
        );
    }
    rows.concat()
}

pub fn movie_row(movie: &Movie) -> String {
    let id = movie.id.to_string();
    format!(
        concat!(
            r#"<tr data-id="{id}">"#,
            "<td>{id}</td><td>{title}</td><td>{year}</td><td>{genres}</td>",
            "<td>{rating}</td><td>{runtime}</td><td>{director}</td>",
            "<td>{actions}</td></tr>"
        ),
        id = escape(&id),
        title = escape(&movie.title),
        year = or_dash(movie.year),
        genres = or_dash(Some(movie.genres.as_str())),
        rating = or_dash(movie.rating.map(|r| format!("{:.1}", r))),
        runtime = or_dash(movie.runtime.map(|m| format!("{} min", m))),
        director = or_dash(movie.director.as_deref()),
        actions = action_buttons("movies", &movie.id, true),
    )
}

pub fn user_row(user: &User) -> String {
    let id = user.id.to_string();
    let role = if user.is_admin { "Admin" } else { "User" };
    let status = if user.is_active {
        r#"<span class="badge badge-success">Active</span>"#
    } else {
        r#"<span class="badge badge-muted">Inactive</span>"#
    };
    format!(
        concat!(
            r#"<tr data-id="{id}">"#,
            "<td>{id}</td><td>{name}</td><td>{email}</td><td>{role}</td>",
            "<td>{status}</td><td>{joined}</td><td>{actions}</td></tr>"
        ),
        id = escape(&id),
        name = escape(&user.name),
        email = escape(&user.email),
        role = role,
        status = status,
        joined = or_dash(user.join_date.as_deref().map(short_date)),
        actions = action_buttons("users", &user.id, !user.is_admin),
    )
}

/// Inline controls. Each carries `data-action` and `data-id` for dispatch.
pub fn action_buttons(resource: &str, id: &EntityId, deletable: bool) -> String {
    let id = escape(&id.to_string());
    let mut out = format!(
        concat!(
            r#"<button class="btn-icon" data-resource="{res}" data-action="view" data-id="{id}" title="View">view</button>"#,
            r#"<button class="btn-icon" data-resource="{res}" data-action="edit" data-id="{id}" title="Edit">edit</button>"#
        ),
        res = resource,
        id = id
    );
    if deletable {
        out.push_str(&format!(
            r#"<button class="btn-icon danger" data-resource="{}" data-action="delete" data-id="{}" title="Delete">delete</button>"#,
            resource, id
        ));
    }
    out
}

pub fn pagination(resource: &str, page: u32, total_pages: u32, total: u64) -> String {
    if total_pages <= 1 {
        return format!(r#"<div class="pagination"><span>{} total</span></div>"#, total);
    }
    let prev = if page > 1 {
        format!(
            r#"<button data-resource="{}" data-page="{}">Previous</button>"#,
            resource,
            page - 1
        )
    } else {
        r#"<button disabled>Previous</button>"#.to_string()
    };
    let next = if page < total_pages {
        format!(
            r#"<button data-resource="{}" data-page="{}">Next</button>"#,
            resource,
            page + 1
        )
    } else {
        r#"<button disabled>Next</button>"#.to_string()
    };
    format!(
        r#"<div class="pagination">{}<span>Page {} of {} ({} total)</span>{}</div>"#,
        prev, page, total_pages, total, next
    )
}
