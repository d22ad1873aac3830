use crate::models::event::CalendarEvent;

/// Pairwise scan over the merged event list. Two events conflict when they
/// share at least one staff id and their `[start, end)` intervals overlap.
/// Populates `conflicts_with` symmetrically; the annotation is advisory and
/// nothing downstream enforces it. Quadratic on purpose: the list is one
/// branch's day/week/month view.
pub fn annotate_conflicts(events: &mut [CalendarEvent]) {
    for e in events.iter_mut() {
        e.conflicts_with.clear();
    }
    for i in 0..events.len() {
        for j in (i + 1)..events.len() {
            let (left, right) = events.split_at_mut(j);
            let a = &mut left[i];
            let b = &mut right[0];
            if a.shares_staff(b) && a.overlaps(b) {
                a.conflicts_with.push(b.id.clone());
                b.conflicts_with.push(a.id.clone());
            }
        }
    }
}
