use crate::classify::has_messaging;
use crate::classify::has_phone_without_messaging;
use crate::classify::WorksheetRole;
use crate::discovery::events::DiscoveryEvent;
use crate::discovery::events::EventSink;
use crate::discovery::set::ClassifiedWorksheetSet;

/// Relabels already-found worksheets to fill missing survey roles.
///
/// A missing product role takes a general-data or critical worksheet with a
/// messaging column; a missing service role takes a general-data worksheet
/// with a phone column and no messaging column. Worksheets move, they are
/// never copied.
pub fn reconcile(set: &mut ClassifiedWorksheetSet, sink: &dyn EventSink) {
    let missing = set.missing_required();

    if missing.contains(&WorksheetRole::ProductFeedback) {
        let candidate = [WorksheetRole::GeneralData, WorksheetRole::CriticalFeedback]
            .into_iter()
            .find(|role| set.get(*role).is_some_and(|worksheet| has_messaging(&worksheet.table)));
        if let Some(from) = candidate {
            relabel(set, from, WorksheetRole::ProductFeedback, sink);
        }
    }

    if missing.contains(&WorksheetRole::ServiceFeedback) {
        let candidate = set
            .get(WorksheetRole::GeneralData)
            .is_some_and(|worksheet| has_phone_without_messaging(&worksheet.table));
        if candidate {
            relabel(set, WorksheetRole::GeneralData, WorksheetRole::ServiceFeedback, sink);
        }
    }
}

fn relabel(set: &mut ClassifiedWorksheetSet, from: WorksheetRole, to: WorksheetRole, sink: &dyn EventSink) {
    let Some(handle) = set.get(from).map(|worksheet| worksheet.handle.clone()) else {
        return;
    };
    if set.relabel(from, to) {
        sink.record(DiscoveryEvent::Reconciled { from, to, handle });
    }
}
