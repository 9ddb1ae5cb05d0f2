mod menu_action;
